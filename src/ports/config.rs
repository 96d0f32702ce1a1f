use std::path::PathBuf;

use crate::domain::ConfigModel;

/// Configuration store port for persisting and loading app configuration.
///
/// `load` and `save` never surface errors to the caller: a missing or corrupt
/// file loads as the default model, and write failures are reported through
/// the log only.
pub trait ConfigStore: Send + Sync {
    /// The configuration record this store persists.
    type Model: ConfigModel;

    /// Load configuration from persistent storage.
    /// Returns the default model if no file exists or the file is corrupt.
    fn load(&self) -> Self::Model;

    /// Schedule `model` to be written. Returns immediately; the write happens
    /// after the debounce window elapses, coalescing rapid successive saves
    /// into a single write of the most recent model.
    fn save(&self, model: Self::Model);

    /// Flush any pending save synchronously and cancel the debounce timer.
    /// Idempotent; a no-op when nothing is pending.
    fn shutdown(&self);

    /// Get the path to the primary configuration file.
    fn config_path(&self) -> PathBuf;

    /// Get the path to the backup configuration file.
    fn backup_path(&self) -> PathBuf;
}
