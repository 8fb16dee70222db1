// src/core/source.rs
//
// Restartable byte sources. Every analyzer opens its own reader, so a
// source must hand out an independent reader positioned at byte 0 on every
// call and produce the same bytes each time.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reader that can also seek (truncation analysis seeks to the tail)
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Factory of fresh readers over the same PCM bytes
pub trait ByteSource: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>>;

    /// Human-readable origin, used in log lines
    fn describe(&self) -> String {
        "<pcm>".to_string()
    }
}

/// Raw PCM file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ByteSource for FileSource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::with_capacity(1 << 16, file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// PCM bytes held in memory (stdin, decoded containers, tests)
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Buffer an arbitrary reader fully into memory
    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}

/// Any closure returning a fresh reader is a source
impl<F> ByteSource for F
where
    F: Fn() -> io::Result<Box<dyn ReadSeek>> + Send + Sync,
{
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        self()
    }
}
