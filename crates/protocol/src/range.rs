use std::fmt;

/// Byte range of a single chunk, as carried by the `Content-Range` header.
///
/// `end` is inclusive: a range covering the first five bytes of a ten byte
/// file is `bytes 0-4/10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    /// Returns the window starting at `offset`, at most `chunk_size` bytes long.
    ///
    /// Returns `None` once `offset` has reached `total` or if `chunk_size` is 0.
    pub fn window(offset: u64, chunk_size: u64, total: u64) -> Option<Self> {
        if offset >= total || chunk_size == 0 {
            return None;
        }
        let end = offset.saturating_add(chunk_size).min(total) - 1;
        Some(Self {
            start: offset,
            end,
            total,
        })
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Offset directly after the last byte of this range.
    pub fn next_offset(&self) -> u64 {
        self.end + 1
    }

    /// Renders the header value, e.g. `bytes 0-5242879/12582912`.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_clamped_to_total() {
        let r = ContentRange::window(8, 4, 10).unwrap();
        assert_eq!((r.start, r.end, r.total), (8, 9, 10));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn window_past_end_is_none() {
        assert!(ContentRange::window(10, 4, 10).is_none());
        assert!(ContentRange::window(0, 4, 0).is_none());
        assert!(ContentRange::window(0, 0, 10).is_none());
    }

    #[test]
    fn header_value_format() {
        let r = ContentRange::window(0, 5_242_880, 12_582_912).unwrap();
        assert_eq!(r.header_value(), "bytes 0-5242879/12582912");
        assert_eq!(r.next_offset(), 5_242_880);
    }
}
