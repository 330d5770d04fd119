//! Memory-mapped frame reading and format sniffing.
//!
//! Frames from a camera burst are often several megabytes. Mapping them
//! avoids the kernel-to-user copy; small files are read normally since the
//! mapping setup costs more than it saves.

use crate::error::LoadError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read a whole frame file, mapping it when it is at least 1MB.
pub fn read_file_bytes(path: &Path) -> Result<FileBytes, LoadError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;

    if metadata.len() >= MMAP_THRESHOLD {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        // SAFETY: the mapping is read-only and the file handle outlives no
        // borrow of it; a concurrent writer could change bytes under us, which
        // at worst produces a decode error.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_error(path, e))?;
        Ok(FileBytes::Mmap(mmap))
    } else {
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Ok(FileBytes::Vec(bytes))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> LoadError {
    LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File bytes that may be either owned or memory-mapped.
pub enum FileBytes {
    Vec(Vec<u8>),
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

/// Container format detected from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Bmp,
    /// Anything else the `image` crate may still understand
    Other,
}

impl SourceFormat {
    /// Sniff the format from the first bytes of a file.
    ///
    /// File extensions are ignored: a PNG named `.jpg` is still a PNG.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            SourceFormat::Jpeg
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            SourceFormat::Png
        } else if bytes.starts_with(b"BM") {
            SourceFormat::Bmp
        } else {
            SourceFormat::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn sniff_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(SourceFormat::sniff(&header), SourceFormat::Jpeg);
    }

    #[test]
    fn sniff_png() {
        let header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(SourceFormat::sniff(&header), SourceFormat::Png);
    }

    #[test]
    fn sniff_bmp_and_unknown() {
        assert_eq!(SourceFormat::sniff(b"BM\x00\x00"), SourceFormat::Bmp);
        assert_eq!(SourceFormat::sniff(&[0xFF, 0xD8]), SourceFormat::Other);
        assert_eq!(SourceFormat::sniff(&[]), SourceFormat::Other);
    }

    #[test]
    fn reads_small_file_into_memory() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();

        let bytes = read_file_bytes(file.path()).unwrap();
        assert!(matches!(bytes, FileBytes::Vec(_)));
        assert_eq!(&*bytes, &[1, 2, 3, 4]);
    }

    #[test]
    fn maps_large_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![7u8; MMAP_THRESHOLD as usize]).unwrap();
        file.flush().unwrap();

        let bytes = read_file_bytes(file.path()).unwrap();
        assert!(matches!(bytes, FileBytes::Mmap(_)));
        assert_eq!(bytes.len(), MMAP_THRESHOLD as usize);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = read_file_bytes(Path::new("/nonexistent/frame.jpg"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
