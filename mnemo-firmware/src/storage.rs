//! Flash partition holding the config volume
//!
//! The last 64KB of the 2MB flash on the board are reserved for the
//! volume (see memory.x). Blocking flash access is used: the volume runs
//! to completion on the caller and never yields.

use core::ops::Range;

use defmt::*;

use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use mnemo_hal::FlashVolume;

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024; // 64KB for config
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: Range<u32> = (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

pub type BoardFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;

/// Volume the configuration lives on
pub type ConfigVolume = FlashVolume<BoardFlash>;

/// Create and mount the config volume over the reserved partition
///
/// A partition left unreadable by a previous image is erased once so the
/// device can save again. If mounting still fails the volume is returned
/// unmounted and the config store keeps the defaults.
pub fn config_volume(flash: Peri<'static, FLASH>) -> ConfigVolume {
    let mut volume = FlashVolume::new(Flash::new_blocking(flash), CONFIG_RANGE);
    if let Err(e) = volume.mount_or_erase() {
        warn!("Config volume unavailable: {}", e);
    }
    volume
}
