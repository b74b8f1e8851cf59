//! Storage volume abstractions
//!
//! Provides traits for a small mounted filesystem that can be implemented
//! by RAM-backed test volumes or chip-specific flash storage.

/// Maximum path length in bytes (including the leading `/`)
pub const MAX_PATH_LEN: usize = 32;

/// Errors from volume operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VolumeError {
    /// Operation attempted before a successful mount
    NotMounted,
    /// The volume could not be mounted
    MountFailed,
    /// No file exists at the path
    NotFound,
    /// Path is empty, not absolute, or longer than [`MAX_PATH_LEN`]
    InvalidPath,
    /// No room left for another file
    Full,
    /// File content exceeds what the volume can hold per file
    FileTooLarge,
    /// Volume refuses writes
    ReadOnly,
    /// Read on a write handle or write on a read handle
    WrongMode,
    /// Underlying storage driver failed
    Io,
}

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Read an existing file from the start
    Read,
    /// Create the file, or truncate it if it already exists
    Write,
}

/// Check that a path is usable on a volume
///
/// Paths are absolute (`/name`), non-empty after the slash and at most
/// [`MAX_PATH_LEN`] bytes long.
pub fn validate_path(path: &str) -> Result<(), VolumeError> {
    if path.len() < 2 || path.len() > MAX_PATH_LEN || !path.starts_with('/') {
        return Err(VolumeError::InvalidPath);
    }
    Ok(())
}

/// An open file on a [`Volume`]
///
/// Dropping a handle without calling [`FileHandle::close`] is allowed, but
/// implementations may discard buffered writes in that case.
pub trait FileHandle {
    /// Current size of the file in bytes
    fn size(&self) -> usize;

    /// Read into `buffer`, returning the number of bytes read (0 at end of file)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, VolumeError>;

    /// Write `data` at the current position, returning the number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize, VolumeError>;

    /// Flush and release the handle
    fn close(self) -> Result<(), VolumeError>;

    /// Fill `buffer` completely from the file
    ///
    /// Fails with [`VolumeError::Io`] if the file ends early.
    fn read_to_end(&mut self, buffer: &mut [u8]) -> Result<(), VolumeError> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.read(&mut buffer[filled..])? {
                0 => return Err(VolumeError::Io),
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Write every byte of `data`
    fn write_all(&mut self, data: &[u8]) -> Result<(), VolumeError> {
        let mut written = 0;
        while written < data.len() {
            match self.write(&data[written..])? {
                0 => return Err(VolumeError::Full),
                n => written += n,
            }
        }
        Ok(())
    }
}

/// A mountable storage volume
///
/// Implementations should make [`Volume::mount`] idempotent: mounting an
/// already-mounted volume succeeds without side effects.
pub trait Volume {
    /// Handle type returned by [`Volume::open`]
    type File<'a>: FileHandle
    where
        Self: 'a;

    /// Make the volume available for reads and writes
    fn mount(&mut self) -> Result<(), VolumeError>;

    /// Whether the volume is currently mounted
    fn is_mounted(&self) -> bool;

    /// Check if a file exists at `path`
    ///
    /// Returns false when the volume is not mounted.
    fn exists(&mut self, path: &str) -> bool;

    /// Open the file at `path`
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File<'_>, VolumeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("/config.json").is_ok());
        assert_eq!(validate_path(""), Err(VolumeError::InvalidPath));
        assert_eq!(validate_path("/"), Err(VolumeError::InvalidPath));
        assert_eq!(validate_path("config.json"), Err(VolumeError::InvalidPath));

        let too_long = "/abcdefghijklmnopqrstuvwxyz012345";
        assert_eq!(too_long.len(), MAX_PATH_LEN + 1);
        assert_eq!(validate_path(too_long), Err(VolumeError::InvalidPath));
    }
}
