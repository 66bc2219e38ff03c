//! Bounded file access shared by the sniffer and parsers.
//!
//! Every read is clamped to the file's real extent; out-of-range windows
//! come back empty instead of erroring, so callers can treat truncation
//! as data rather than control flow.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// A file opened with its size captured, serving clamped window reads.
pub struct BoundedFile {
    file: File,
    size: u64,
}

impl BoundedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        debug!("opened {:?} ({} bytes)", path.as_ref(), size);
        Ok(Self { file, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read up to `len` bytes starting at `offset`, clamped to EOF.
    /// An offset at or past EOF yields an empty buffer.
    pub fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        if offset >= self.size {
            return Ok(Vec::new());
        }
        let avail = (self.size - offset) as usize;
        let want = len.min(avail);
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; want];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// First `len` bytes of the file (or fewer, near EOF).
    pub fn read_prefix(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.read_at(0, len)
    }

    /// Last `len` bytes of the file (or the whole file when shorter).
    pub fn read_suffix(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let n = (len as u64).min(self.size);
        self.read_at(self.size - n, n as usize)
    }

    /// The entire file. Only the single-pass parsers use this.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.read_at(0, self.size as usize)
    }
}

/// File size without keeping the handle.
pub fn file_size<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Read the first `len` bytes of `path`.
pub fn read_prefix<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Vec<u8>> {
    BoundedFile::open(path)?.read_prefix(len)
}

/// Read the last `len` bytes of `path`.
pub fn read_suffix<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Vec<u8>> {
    BoundedFile::open(path)?.read_suffix(len)
}
