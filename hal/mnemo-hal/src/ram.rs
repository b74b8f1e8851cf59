//! RAM-backed volume
//!
//! A fixed-capacity in-memory volume for host testing and simulation.
//! Contents are lost when the value is dropped. Mount and write failures
//! can be injected to exercise error paths.

use heapless::{String, Vec};

use crate::volume::{validate_path, FileHandle, OpenMode, Volume, VolumeError, MAX_PATH_LEN};

struct RamEntry<const SIZE: usize> {
    path: String<MAX_PATH_LEN>,
    data: Vec<u8, SIZE>,
}

/// In-memory volume holding up to `FILES` files of at most `SIZE` bytes each
pub struct RamVolume<const FILES: usize = 4, const SIZE: usize = 1024> {
    files: Vec<RamEntry<SIZE>, FILES>,
    mounted: bool,
    mountable: bool,
    read_only: bool,
}

impl<const FILES: usize, const SIZE: usize> RamVolume<FILES, SIZE> {
    /// Create an empty, unmounted volume
    pub const fn new() -> Self {
        Self {
            files: Vec::new(),
            mounted: false,
            mountable: true,
            read_only: false,
        }
    }

    /// Allow or refuse future mounts
    ///
    /// Refusing also unmounts the volume, simulating a missing or
    /// unformatted partition.
    pub fn set_mountable(&mut self, mountable: bool) {
        self.mountable = mountable;
        if !mountable {
            self.mounted = false;
        }
    }

    /// Make opening files for writing fail with [`VolumeError::ReadOnly`]
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Unmount without touching the stored files
    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    /// Erase every file
    pub fn format(&mut self) {
        self.files.clear();
    }

    /// Raw contents of the file at `path`, regardless of mount state
    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        self.find(path).map(|idx| self.files[idx].data.as_slice())
    }

    /// Number of files on the volume
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn find(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.path.as_str() == path)
    }
}

impl<const FILES: usize, const SIZE: usize> Default for RamVolume<FILES, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open file on a [`RamVolume`]
pub struct RamFile<'a, const SIZE: usize> {
    data: &'a mut Vec<u8, SIZE>,
    pos: usize,
    mode: OpenMode,
}

impl<const SIZE: usize> FileHandle for RamFile<'_, SIZE> {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, VolumeError> {
        if self.mode != OpenMode::Read {
            return Err(VolumeError::WrongMode);
        }
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buffer.len());
        buffer[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, VolumeError> {
        if self.mode != OpenMode::Write {
            return Err(VolumeError::WrongMode);
        }
        self.data
            .extend_from_slice(data)
            .map_err(|_| VolumeError::FileTooLarge)?;
        self.pos += data.len();
        Ok(data.len())
    }

    fn close(self) -> Result<(), VolumeError> {
        Ok(())
    }
}

impl<const FILES: usize, const SIZE: usize> Volume for RamVolume<FILES, SIZE> {
    type File<'a>
        = RamFile<'a, SIZE>
    where
        Self: 'a;

    fn mount(&mut self) -> Result<(), VolumeError> {
        if self.mounted {
            return Ok(());
        }
        if !self.mountable {
            return Err(VolumeError::MountFailed);
        }
        self.mounted = true;
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn exists(&mut self, path: &str) -> bool {
        self.mounted && validate_path(path).is_ok() && self.find(path).is_some()
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File<'_>, VolumeError> {
        if !self.mounted {
            return Err(VolumeError::NotMounted);
        }
        validate_path(path)?;

        let idx = match mode {
            OpenMode::Read => self.find(path).ok_or(VolumeError::NotFound)?,
            OpenMode::Write => {
                if self.read_only {
                    return Err(VolumeError::ReadOnly);
                }
                match self.find(path) {
                    Some(idx) => idx,
                    None => {
                        let path = String::try_from(path).map_err(|_| VolumeError::InvalidPath)?;
                        self.files
                            .push(RamEntry {
                                path,
                                data: Vec::new(),
                            })
                            .map_err(|_| VolumeError::Full)?;
                        self.files.len() - 1
                    }
                }
            }
        };

        let data = &mut self.files[idx].data;
        if mode == OpenMode::Write {
            data.clear();
        }

        Ok(RamFile { data, pos: 0, mode })
    }
}
