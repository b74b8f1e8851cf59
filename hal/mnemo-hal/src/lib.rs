//! Mnemo Hardware Abstraction Layer
//!
//! This crate defines the storage volume abstraction that the configuration
//! store persists through, plus the volumes the firmware and tests use.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  mnemo-core (ConfigStore)               │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mnemo-hal (this crate - Volume trait)  │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  RamVolume    │       │  FlashVolume  │
//! │  (host/test)  │       │  (NOR flash)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`volume::Volume`] - Mountable filesystem with path-addressed files
//! - [`volume::FileHandle`] - Open file for reading or writing

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

#[cfg(feature = "sequential-storage")]
pub mod flash;
pub mod ram;
pub mod volume;

// Re-export key types at crate root for convenience
#[cfg(feature = "sequential-storage")]
pub use flash::FlashVolume;
pub use ram::RamVolume;
pub use volume::{FileHandle, OpenMode, Volume, VolumeError, MAX_PATH_LEN};
