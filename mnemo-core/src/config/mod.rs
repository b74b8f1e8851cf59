//! Device configuration
//!
//! The configuration record, its stored JSON form, and the store that
//! moves it between memory and a volume.

pub mod document;
pub mod record;
pub mod store;

pub use document::{DocumentError, MAX_DOCUMENT_SIZE};
pub use record::*;
pub use store::{ConfigStore, FieldOutcome, LoadSummary, SkipReason, StoreError, CONFIG_PATH};
