use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Future returned by [`BoxSource::read_range`].
pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<u8>>> + Send + 'a>>;

/// Random-access, read-only view of a box file.
///
/// The file must not change while an upload is running: its bytes are hashed
/// once and then sent from whatever offset the server confirms.
pub trait BoxSource: Send + Sync {
    /// Display name, used for extension checks and log fields.
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `len` bytes starting at `start`.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if the range runs past the
    /// end of the file.
    fn read_range(&self, start: u64, len: usize) -> ReadFuture<'_>;
}

fn check_bounds(start: u64, len: usize, size: u64) -> io::Result<()> {
    let end = start.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {start}+{len} exceeds file size {size}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// LocalBoxFile
// ---------------------------------------------------------------------------

/// A box file on the local filesystem.
pub struct LocalBoxFile {
    path: PathBuf,
    name: String,
    size: u64,
    file: Mutex<tokio::fs::File>,
}

impl LocalBoxFile {
    /// Opens `path` and captures its current size.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path).await?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            name,
            size: meta.len(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BoxSource for LocalBoxFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.size
    }

    fn read_range(&self, start: u64, len: usize) -> ReadFuture<'_> {
        Box::pin(async move {
            check_bounds(start, len, self.size)?;
            let mut file = self.file.lock().await;
            file.seek(SeekFrom::Start(start)).await?;
            let mut buf = vec![0u8; len];
            file.read_exact(&mut buf).await?;
            Ok(buf)
        })
    }
}

// ---------------------------------------------------------------------------
// InMemorySource
// ---------------------------------------------------------------------------

/// A box held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    name: String,
    data: Vec<u8>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl BoxSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, start: u64, len: usize) -> ReadFuture<'_> {
        Box::pin(async move {
            check_bounds(start, len, self.len())?;
            let start = start as usize;
            Ok(self.data[start..start + len].to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_file_reads_ranges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("precise64.box");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"0123456789")
            .unwrap();

        let file = LocalBoxFile::open(&path).await.unwrap();
        assert_eq!(file.name(), "precise64.box");
        assert_eq!(file.len(), 10);
        assert_eq!(file.read_range(6, 4).await.unwrap(), b"6789");
        assert_eq!(file.read_range(0, 3).await.unwrap(), b"012");
    }

    #[tokio::test]
    async fn local_file_short_read_is_eof() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.box");
        std::fs::write(&path, b"abc").unwrap();

        let file = LocalBoxFile::open(&path).await.unwrap();
        let err = file.read_range(2, 5).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn local_file_rejects_directory() {
        let dir = TempDir::new().unwrap();
        assert!(LocalBoxFile::open(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn in_memory_bounds() {
        let src = InMemorySource::new("m.box", b"hello".to_vec());
        assert_eq!(src.read_range(1, 3).await.unwrap(), b"ell");
        assert!(src.read_range(4, 2).await.is_err());
        assert!(src.read_range(u64::MAX, 1).await.is_err());
        assert!(!src.is_empty());
    }
}
