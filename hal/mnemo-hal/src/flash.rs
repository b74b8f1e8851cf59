//! NOR flash volume
//!
//! Uses sequential-storage for wear-leveled key-value storage on a flash
//! partition. Each file is one map item keyed by its path.
//!
//! sequential-storage only exposes async operations. The flash driver is
//! wrapped in embassy-embedded-hal's `BlockingAsync` adapter and every call
//! is driven to completion with `embassy_futures::block_on`, so the volume
//! itself stays synchronous.
//!
//! Write handles buffer the whole file in RAM and commit it on
//! [`FileHandle::close`]. A handle dropped without closing writes nothing,
//! and a committed file replaces the previous version as a unit.

use core::ops::Range;

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_futures::block_on;
use embedded_storage::nor_flash::NorFlash;
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use heapless::{String, Vec};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use crate::volume::{validate_path, FileHandle, OpenMode, Volume, VolumeError, MAX_PATH_LEN};

/// Largest file the flash volume stores
pub const MAX_FILE_SIZE: usize = 1024;

/// Scratch buffer for sequential-storage (item header + key + value)
const DATA_BUFFER_SIZE: usize = 2048;

/// Map key identifying a file by its path
///
/// Serialized as a length byte followed by the UTF-8 path bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey(String<MAX_PATH_LEN>);

impl PathKey {
    /// Build a key from a validated path
    pub fn new(path: &str) -> Result<Self, VolumeError> {
        validate_path(path)?;
        String::try_from(path)
            .map(Self)
            .map_err(|_| VolumeError::InvalidPath)
    }

    /// The path this key names
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Key for PathKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let bytes = self.0.as_bytes();
        let len = bytes.len() + 1;
        if buffer.len() < len {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[0] = bytes.len() as u8;
        buffer[1..len].copy_from_slice(bytes);
        Ok(len)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        let (&len, rest) = buffer
            .split_first()
            .ok_or(SerializationError::BufferTooSmall)?;
        let len = len as usize;
        if len > MAX_PATH_LEN {
            return Err(SerializationError::InvalidFormat);
        }
        let bytes = rest.get(..len).ok_or(SerializationError::BufferTooSmall)?;
        let path = core::str::from_utf8(bytes).map_err(|_| SerializationError::InvalidFormat)?;
        let path = String::try_from(path).map_err(|_| SerializationError::InvalidFormat)?;
        Ok((Self(path), len + 1))
    }
}

fn map_storage_error<E>(error: sequential_storage::Error<E>) -> VolumeError {
    match error {
        sequential_storage::Error::FullStorage => VolumeError::Full,
        _ => VolumeError::Io,
    }
}

/// Flash-backed volume on a blocking NOR flash partition
pub struct FlashVolume<F> {
    flash: BlockingAsync<F>,
    range: Range<u32>,
    mounted: bool,
}

impl<F: NorFlash> FlashVolume<F> {
    /// Create a volume over `range` of `flash`
    ///
    /// The range must be aligned to the flash erase size and span at least
    /// two erase pages; this is checked on mount.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self {
            flash: BlockingAsync::new(flash),
            range,
            mounted: false,
        }
    }

    /// Erase the whole partition
    ///
    /// Every file is lost. The volume stays mounted if it was.
    pub fn erase_all(&mut self) -> Result<(), VolumeError> {
        warn!("Erasing flash volume {=u32:#x}..{=u32:#x}", self.range.start, self.range.end);
        block_on(AsyncNorFlash::erase(
            &mut self.flash,
            self.range.start,
            self.range.end,
        ))
        .map_err(|_| VolumeError::Io)
    }

    /// Mount, erasing the partition first if its contents are unreadable
    ///
    /// Recovers a partition holding bytes that are not a map, such as data
    /// from a previous image. Every stored file is lost in that case.
    pub fn mount_or_erase(&mut self) -> Result<(), VolumeError> {
        match self.mount() {
            Err(VolumeError::MountFailed) if self.geometry_ok() => {
                warn!("Flash volume unreadable, erasing");
                self.erase_all()?;
                self.mount()
            }
            result => result,
        }
    }

    /// Forget the mount state; the next operation must mount again
    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    fn geometry_ok(&self) -> bool {
        let page = F::ERASE_SIZE as u32;
        let (start, end) = (self.range.start, self.range.end);
        page > 0 && start % page == 0 && end % page == 0 && end > start && (end - start) / page >= 2
    }

    /// Fetch the item for `key` into `out`, returning whether it exists
    fn fetch(
        &mut self,
        key: &PathKey,
        out: &mut Vec<u8, MAX_FILE_SIZE>,
    ) -> Result<bool, VolumeError> {
        let mut data_buffer = [0u8; DATA_BUFFER_SIZE];

        let result = block_on(map::fetch_item::<PathKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            key,
        ));

        match result {
            Ok(Some(data)) => {
                out.clear();
                out.extend_from_slice(data)
                    .map_err(|_| VolumeError::FileTooLarge)?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(map_storage_error(e)),
        }
    }

    fn store(&mut self, key: &PathKey, data: &[u8]) -> Result<(), VolumeError> {
        let mut data_buffer = [0u8; DATA_BUFFER_SIZE];

        block_on(map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            key,
            &data,
        ))
        .map_err(map_storage_error)
    }
}

/// Open file on a [`FlashVolume`]
pub struct FlashFile<'a, F: NorFlash> {
    volume: &'a mut FlashVolume<F>,
    key: PathKey,
    data: Vec<u8, MAX_FILE_SIZE>,
    pos: usize,
    mode: OpenMode,
}

impl<F: NorFlash> FileHandle for FlashFile<'_, F> {
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
        if self.mode == OpenMode::Write {
            debug!("Committing {} bytes to {}", self.data.len(), self.key.as_str());
            self.volume.store(&self.key, &self.data)?;
        }
        Ok(())
    }
}

impl<F: NorFlash> Volume for FlashVolume<F> {
    type File<'a>
        = FlashFile<'a, F>
    where
        Self: 'a;

    fn mount(&mut self) -> Result<(), VolumeError> {
        if self.mounted {
            return Ok(());
        }
        if !self.geometry_ok() {
            warn!("Flash volume range is not aligned to erase pages");
            return Err(VolumeError::MountFailed);
        }

        // Probe the map; corruption surfaces here rather than on first use
        let probe = PathKey(String::new());
        if let Err(e) = self.fetch(&probe, &mut Vec::new()) {
            warn!("Flash volume probe failed: {:?}", e);
            return Err(VolumeError::MountFailed);
        }

        info!("Flash volume mounted");
        self.mounted = true;
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn exists(&mut self, path: &str) -> bool {
        if !self.mounted {
            return false;
        }
        match PathKey::new(path) {
            Ok(key) => matches!(self.fetch(&key, &mut Vec::new()), Ok(true)),
            Err(_) => false,
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File<'_>, VolumeError> {
        if !self.mounted {
            return Err(VolumeError::NotMounted);
        }
        let key = PathKey::new(path)?;

        let mut data = Vec::new();
        if mode == OpenMode::Read && !self.fetch(&key, &mut data)? {
            return Err(VolumeError::NotFound);
        }

        Ok(FlashFile {
            volume: self,
            key,
            data,
            pos: 0,
            mode,
        })
    }
}
