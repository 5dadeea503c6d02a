use crate::TransferError;

/// Extension every uploadable box must carry.
pub const BOX_EXTENSION: &str = ".box";

/// Checks that `file_name` names a box (`*.box`, any case).
pub fn validate_box_file_name(file_name: &str) -> Result<(), TransferError> {
    if file_name.to_ascii_lowercase().ends_with(BOX_EXTENSION) {
        Ok(())
    } else {
        Err(TransferError::InvalidFileName(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_box_files() {
        assert!(validate_box_file_name("precise64.box").is_ok());
        assert!(validate_box_file_name("Precise64.BOX").is_ok());
        assert!(validate_box_file_name("a.b.box").is_ok());
        assert!(validate_box_file_name(".box").is_ok());
    }

    #[test]
    fn rejects_other_files() {
        for name in ["", "image.iso", "precise64.box.tar", "box"] {
            assert!(
                matches!(
                    validate_box_file_name(name),
                    Err(TransferError::InvalidFileName(_))
                ),
                "accepted {name:?}"
            );
        }
    }
}
