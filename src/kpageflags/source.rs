//! Sources of page flag tables.
//!
//! The live source is `/proc/kpageflags`; tests and offline runs use an
//! in-memory table with the same record format.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Size of one flag record in bytes.
pub const RECORD_SIZE: usize = 8;

/// Something that can be opened for one sequential scan of flag records.
pub trait FlagTable {
    type Reader: Read;

    /// Opens a fresh reader positioned at physical page 0.
    fn open(&self) -> io::Result<Self::Reader>;

    /// Human-readable origin, used in log messages.
    fn describe(&self) -> String;
}

/// Flag table backed by a file, normally `/proc/kpageflags`.
#[derive(Debug, Clone)]
pub struct KPageFlagsFile {
    path: PathBuf,
}

impl KPageFlagsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagTable for KPageFlagsFile {
    type Reader = File;

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Flag table held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlagTable {
    bytes: Vec<u8>,
}

impl InMemoryFlagTable {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_words(words: &[u64]) -> Self {
        Self {
            bytes: encode_records(words),
        }
    }
}

impl FlagTable for InMemoryFlagTable {
    type Reader = Cursor<Vec<u8>>;

    fn open(&self) -> io::Result<Self::Reader> {
        Ok(Cursor::new(self.bytes.clone()))
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} bytes)", self.bytes.len())
    }
}

/// Encodes flag words in the kernel's little-endian record format.
pub fn encode_records(words: &[u64]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
