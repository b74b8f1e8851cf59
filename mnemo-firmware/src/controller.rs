//! Application controller
//!
//! Owns the device configuration for the lifetime of the firmware. Other
//! subsystems borrow the current values through [`Controller::config`] and
//! change them through [`Controller::config_mut`] followed by
//! [`Controller::save`].

use defmt::*;
use mnemo_core::config::{ConfigRecord, ConfigStore, Field};
use mnemo_hal::Volume;

pub struct Controller<V> {
    /// Current configuration (defaults until the stored record is loaded)
    config: ConfigRecord,
    /// Persistence for `config`
    store: ConfigStore<V>,
}

impl<V: Volume> Controller<V> {
    /// Create a controller holding the compiled-in defaults
    pub fn new(volume: V) -> Self {
        Self {
            config: ConfigRecord::default(),
            store: ConfigStore::new(volume),
        }
    }

    /// Restore the stored configuration over the defaults
    ///
    /// Any storage problem is logged and the current values are kept, so
    /// boot always continues. An empty volume is seeded with the defaults.
    pub fn boot(&mut self) {
        self.store.load_or_seed(&mut self.config);
    }

    pub fn config(&self) -> &ConfigRecord {
        &self.config
    }

    /// Mutable access to the configuration; call [`Controller::save`] after
    pub fn config_mut(&mut self) -> &mut ConfigRecord {
        &mut self.config
    }

    /// Persist the current configuration
    pub fn save(&mut self) {
        self.store.save(&self.config);
    }

    /// Apply build-time provisioned values and persist them if any changed
    ///
    /// `None` entries and values equal to the current ones are skipped.
    pub fn apply_provisioned(&mut self, values: &[(Field, Option<&str>)]) {
        let mut changed = false;
        for &(field, value) in values {
            let Some(value) = value else { continue };
            if self.config.get(field) == value {
                continue;
            }
            match self.config_mut().set(field, value) {
                Ok(()) => {
                    info!("Provisioned {}", field.key());
                    changed = true;
                }
                Err(e) => warn!("Ignoring provisioned {}: {}", field.key(), e),
            }
        }

        if changed {
            self.save();
        }
    }
}
