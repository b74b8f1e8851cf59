//! Board-agnostic core logic for the Mnemo firmware
//!
//! This crate contains everything that does not depend on a specific
//! board or flash chip:
//!
//! - The configuration record (broker address and credentials)
//! - The stored JSON document format
//! - The configuration store (load at boot, save on change)

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod config;
