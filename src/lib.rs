#![forbid(unsafe_code)]

//! Debounced, crash-safe persistence for a single application configuration
//! file. A [`TomlConfigStore`] coalesces bursts of `save` calls into one
//! write, keeps a one-generation backup next to the primary file, and
//! quarantines corrupt files on load instead of failing the caller.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use adapters::TomlConfigStore;
pub use domain::{ConfigModel, StoreError};
pub use ports::ConfigStore;
