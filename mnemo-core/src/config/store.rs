//! Configuration persistence
//!
//! Saves the [`ConfigRecord`] to a single file on a mounted volume and
//! restores it at boot.
//!
//! Persistence is best effort: [`ConfigStore::load`] and
//! [`ConfigStore::save`] log every failure and return normally, so the
//! device always boots with a usable record (the compiled-in defaults at
//! worst). Callers that need to react to failures use
//! [`ConfigStore::try_load`] and [`ConfigStore::try_save`].

use alloc::vec;
use alloc::vec::Vec;

use mnemo_hal::{FileHandle, OpenMode, Volume, VolumeError};

use super::document::{self, DocumentError, ValueError, MAX_DOCUMENT_SIZE};
use super::record::{ConfigRecord, Field, FieldError};

/// Path of the stored record on the volume
pub const CONFIG_PATH: &str = "/config.json";

/// Configuration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Volume could not be mounted
    VolumeUnavailable(VolumeError),
    /// No record stored at the path
    RecordAbsent,
    /// Opening, reading, writing or closing the file failed
    Handle(VolumeError),
    /// Stored content is not a valid document
    Malformed,
    /// Stored document exceeds the parse budget
    DocumentTooLarge { size: usize },
    /// Record could not be serialized
    Encode,
    /// Encoded record exceeds the parse budget and was not written
    RecordTooLarge { size: usize },
}

impl From<VolumeError> for StoreError {
    fn from(e: VolumeError) -> Self {
        StoreError::Handle(e)
    }
}

impl From<DocumentError> for StoreError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::TooLarge { size } => StoreError::DocumentTooLarge { size },
            DocumentError::Malformed => StoreError::Malformed,
            DocumentError::Encode => StoreError::Encode,
        }
    }
}

/// Why a field kept its in-memory value during a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SkipReason {
    /// Key absent from the stored document
    Missing,
    /// Stored value is not a string
    NotAString,
    /// Stored value exceeds the field capacity
    TooLong,
    /// Stored value contains a NUL byte
    InteriorNul,
}

impl From<ValueError> for SkipReason {
    fn from(e: ValueError) -> Self {
        match e {
            ValueError::Missing => SkipReason::Missing,
            ValueError::NotAString => SkipReason::NotAString,
        }
    }
}

impl From<FieldError> for SkipReason {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::TooLong { .. } => SkipReason::TooLong,
            FieldError::InteriorNul { .. } => SkipReason::InteriorNul,
        }
    }
}

/// What happened to one field during a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldOutcome {
    /// Field was overwritten from the stored document
    Applied,
    /// Field kept its in-memory value
    Skipped(SkipReason),
}

/// Per-field result of a successful [`ConfigStore::try_load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadSummary {
    outcomes: [FieldOutcome; 3],
}

impl LoadSummary {
    /// Outcome for one field
    pub fn outcome(&self, field: Field) -> FieldOutcome {
        self.outcomes[field.index()]
    }

    /// Whether every field was applied
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| *o == FieldOutcome::Applied)
    }

    /// Number of fields applied
    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| **o == FieldOutcome::Applied)
            .count()
    }
}

/// Persists a [`ConfigRecord`] on a [`Volume`]
pub struct ConfigStore<V> {
    volume: V,
    path: &'static str,
}

impl<V: Volume> ConfigStore<V> {
    /// Create a store using [`CONFIG_PATH`]
    pub fn new(volume: V) -> Self {
        Self::with_path(volume, CONFIG_PATH)
    }

    /// Create a store at a custom path
    pub fn with_path(volume: V, path: &'static str) -> Self {
        Self { volume, path }
    }

    /// Path the record is stored at
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn volume(&self) -> &V {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut V {
        &mut self.volume
    }

    /// Consume the store and return the underlying volume
    pub fn into_volume(self) -> V {
        self.volume
    }

    /// Load the stored record into `record`, keeping current values on failure
    pub fn load(&mut self, record: &mut ConfigRecord) {
        match self.try_load(record) {
            Ok(summary) if summary.is_complete() => {
                info!("Configuration loaded from {}", self.path);
                log_record_summary(record);
            }
            Ok(summary) => {
                info!(
                    "Configuration partially loaded from {} ({} of 3 fields)",
                    self.path,
                    summary.applied_count()
                );
                for field in Field::ALL {
                    if let FieldOutcome::Skipped(reason) = summary.outcome(field) {
                        warn!("Kept current {}: {:?}", field.key(), reason);
                    }
                }
                log_record_summary(record);
            }
            Err(StoreError::RecordAbsent) => {
                debug!("No configuration at {}, keeping current values", self.path);
            }
            Err(e) => {
                warn!("Failed to load configuration: {:?}, keeping current values", e);
            }
        }
    }

    /// Save `record`, logging instead of returning failures
    pub fn save(&mut self, record: &ConfigRecord) {
        match self.try_save(record) {
            Ok(len) => info!("Configuration saved to {} ({} bytes)", self.path, len),
            Err(e) => warn!("Failed to save configuration: {:?}", e),
        }
    }

    /// Load the stored record into `record`
    ///
    /// Nothing is written to `record` unless the whole document decodes.
    /// Each field is then applied independently: a missing, non-string or
    /// oversized value leaves that field as it was.
    pub fn try_load(&mut self, record: &mut ConfigRecord) -> Result<LoadSummary, StoreError> {
        self.volume
            .mount()
            .map_err(StoreError::VolumeUnavailable)?;

        if !self.volume.exists(self.path) {
            return Err(StoreError::RecordAbsent);
        }

        let bytes = self.read_record()?;
        debug!("Read {} bytes of configuration", bytes.len());

        let document = document::decode(&bytes)?;

        let mut outcomes = [FieldOutcome::Applied; 3];
        for field in Field::ALL {
            let applied = document
                .value(field)
                .map_err(SkipReason::from)
                .and_then(|value| record.set(field, value).map_err(SkipReason::from));

            if let Err(reason) = applied {
                outcomes[field.index()] = FieldOutcome::Skipped(reason);
            }
        }

        Ok(LoadSummary { outcomes })
    }

    /// Save `record`, returning the number of bytes written
    ///
    /// The document is fully encoded and checked against
    /// [`MAX_DOCUMENT_SIZE`] before the file is opened. A record that could
    /// not be loaded back is never written, and the stored one is kept.
    pub fn try_save(&mut self, record: &ConfigRecord) -> Result<usize, StoreError> {
        self.volume
            .mount()
            .map_err(StoreError::VolumeUnavailable)?;

        let bytes = document::encode(record)?;
        if bytes.len() > MAX_DOCUMENT_SIZE {
            return Err(StoreError::RecordTooLarge { size: bytes.len() });
        }

        let mut file = self.volume.open(self.path, OpenMode::Write)?;
        file.write_all(&bytes)?;
        file.close()?;

        Ok(bytes.len())
    }

    /// Load the stored record, or store `record` when the volume has none
    ///
    /// Seeds a freshly formatted volume with the current values so the next
    /// boot finds a record.
    pub fn load_or_seed(&mut self, record: &mut ConfigRecord) {
        self.load(record);
        if self.volume.is_mounted() && !self.volume.exists(self.path) {
            info!("Seeding {} with current configuration", self.path);
            self.save(record);
        }
    }

    /// Read the whole stored file into a buffer of exactly its size
    fn read_record(&mut self) -> Result<Vec<u8>, StoreError> {
        let mut file = self.volume.open(self.path, OpenMode::Read)?;

        let size = file.size();
        if size > MAX_DOCUMENT_SIZE {
            return Err(StoreError::DocumentTooLarge { size });
        }

        let mut buffer = vec![0u8; size];
        file.read_to_end(&mut buffer)?;
        file.close()?;

        Ok(buffer)
    }
}

/// Log a summary of the record without the password
fn log_record_summary(record: &ConfigRecord) {
    debug!("  broker: {}", record.broker_address());
    debug!("  username: {}", record.username());
    debug!("  password set: {}", record.has_password());
}
