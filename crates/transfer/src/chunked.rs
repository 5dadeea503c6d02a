use boxreg_protocol::ContentRange;

use crate::{BoxSource, TransferError};

/// One contiguous byte range of a box and its bytes, sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub range: ContentRange,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads exactly the bytes of `range` from `source`.
pub async fn read_chunk(
    source: &dyn BoxSource,
    range: ContentRange,
) -> Result<Chunk, TransferError> {
    let data = source.read_range(range.start, range.len() as usize).await?;
    Ok(Chunk { range, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySource;

    #[tokio::test]
    async fn read_chunk_matches_range() {
        let src = InMemorySource::new("c.box", b"AABBCCDDEE".to_vec());
        let range = ContentRange::window(8, 4, 10).unwrap();
        let chunk = read_chunk(&src, range).await.unwrap();
        assert_eq!(chunk.data, b"EE");
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.range, range);
    }
}
