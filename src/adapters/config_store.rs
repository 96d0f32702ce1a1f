use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{ConfigModel, StoreError};
use crate::ports::ConfigStore;

const CONFIG_FILE: &str = "config.toml";
const BACKUP_FILE: &str = "config_backup.toml";
const QUARANTINE_PREFIX: &str = "config_corrupted_";

/// Delay between the first unflushed `save` and the write it schedules.
/// Further saves inside the window update the pending model without
/// postponing the write.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(1000);

struct Pending<M> {
    model: Option<M>,
    timer: Option<JoinHandle<()>>,
}

struct Inner<M> {
    primary_path: PathBuf,
    backup_path: PathBuf,
    /// Serializes every file-touching operation: load's read, the flush's
    /// write and backup rotation, and the quarantine rename.
    file_access: Mutex<()>,
    pending: Mutex<Pending<M>>,
}

impl<M: ConfigModel> Inner<M> {
    /// Write the pending model, if any, and clear the debounce timer slot.
    /// Called from the timer task on expiry and synchronously from shutdown;
    /// the file-access lock makes the two mutually exclusive, and taking the
    /// pending model under its own lock ensures it is consumed exactly once.
    fn flush_pending(&self) {
        let _io = self.file_access.lock();
        let model = {
            let mut pending = self.pending.lock();
            pending.timer = None;
            pending.model.take()
        };
        let Some(model) = model else {
            return;
        };
        match self.write_model(&model) {
            Ok(()) => debug!(path = ?self.primary_path, "Configuration saved"),
            Err(e) => error!(
                error = %e,
                path = ?self.primary_path,
                "Scheduled configuration flush failed, pending model lost"
            ),
        }
    }

    fn write_model(&self, model: &M) -> Result<(), StoreError> {
        if let Some(parent) = self.primary_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(model)?;

        // Rotate the previous generation into the backup slot before the
        // primary is overwritten. The rename is an atomic in-place replace on
        // the same filesystem; the copy branch only runs when no backup
        // exists yet.
        if self.primary_path.exists() {
            if self.backup_path.exists() {
                fs::rename(&self.primary_path, &self.backup_path)?;
            } else {
                fs::copy(&self.primary_path, &self.backup_path)?;
            }
        }

        let created = !self.primary_path.exists();
        fs::write(&self.primary_path, &content)?;
        if created {
            grant_world_access(&self.primary_path)?;
        }

        // Very first flush: seed the backup with the primary's content so
        // both files hold the latest model.
        if !self.backup_path.exists() {
            fs::copy(&self.primary_path, &self.backup_path)?;
        }

        Ok(())
    }

    /// Rename an undecodable primary out of the way so the next load sees
    /// "file absent". A failed rename is logged and otherwise ignored.
    fn quarantine_corrupted(&self) {
        let ticks = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let quarantine = self
            .primary_path
            .with_file_name(format!("{QUARANTINE_PREFIX}{ticks}.toml"));

        match fs::rename(&self.primary_path, &quarantine) {
            Ok(()) => warn!(path = ?quarantine, "Corrupt configuration file quarantined"),
            Err(e) => warn!(
                error = %e,
                path = ?self.primary_path,
                "Failed to quarantine corrupt configuration file"
            ),
        }
    }
}

/// TOML-based configuration store with debounced, crash-safe writes.
///
/// `save` coalesces bursts of calls into a single write of the most recent
/// model, performed one debounce delay after the first call of the burst.
/// Every successful flush leaves a one-generation backup next to the primary
/// file, rotated by atomic rename. Dropping the store flushes any pending
/// model, as does calling [`ConfigStore::shutdown`] explicitly.
pub struct TomlConfigStore<M: ConfigModel> {
    inner: Arc<Inner<M>>,
    runtime: Handle,
}

impl<M: ConfigModel> TomlConfigStore<M> {
    /// Create a store rooted at an explicit base directory.
    ///
    /// Neither the directory nor any file is created until the first flush.
    /// Must be called inside a tokio runtime; the runtime handle is captured
    /// here so `save` can be invoked from any thread afterwards.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|_| {
            StoreError::Config(
                "TomlConfigStore must be created inside a tokio runtime".to_string(),
            )
        })?;
        let base_dir = base_dir.into();

        info!(base_dir = ?base_dir, "ConfigStore initialized");

        Ok(Self {
            inner: Arc::new(Inner {
                primary_path: base_dir.join(CONFIG_FILE),
                backup_path: base_dir.join(BACKUP_FILE),
                file_access: Mutex::new(()),
                pending: Mutex::new(Pending {
                    model: None,
                    timer: None,
                }),
            }),
            runtime,
        })
    }

    /// Create a store in the OS machine-wide shared configuration directory.
    /// - Windows: %ProgramData%\<app_name>\
    /// - macOS: /Library/Application Support/<app_name>/
    /// - Linux and other Unix: /var/lib/<app_name>/
    pub fn in_shared_config_dir(app_name: &str) -> Result<Self, StoreError> {
        Self::with_base_dir(shared_config_dir(app_name)?)
    }
}

impl<M: ConfigModel> ConfigStore for TomlConfigStore<M> {
    type Model = M;

    fn load(&self) -> M {
        let _io = self.inner.file_access.lock();

        if !self.inner.primary_path.exists() {
            debug!(
                path = ?self.inner.primary_path,
                "Configuration file not found, using defaults"
            );
            return M::default();
        }

        let content = match fs::read_to_string(&self.inner.primary_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    error = %e,
                    path = ?self.inner.primary_path,
                    "Failed to read configuration file, using defaults"
                );
                return M::default();
            }
        };

        match toml::from_str(&content) {
            Ok(model) => {
                debug!(path = ?self.inner.primary_path, "Configuration loaded");
                model
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = ?self.inner.primary_path,
                    "Failed to decode configuration file, using defaults"
                );
                self.inner.quarantine_corrupted();
                M::default()
            }
        }
    }

    fn save(&self, model: M) {
        // Pending assignment and timer creation happen under one lock so
        // concurrent saves can never start a second timer.
        let mut pending = self.inner.pending.lock();
        pending.model = Some(model);
        if pending.timer.is_none() {
            let inner = Arc::clone(&self.inner);
            pending.timer = Some(self.runtime.spawn(async move {
                tokio::time::sleep(DEBOUNCE_DELAY).await;
                inner.flush_pending();
            }));
        }
    }

    fn shutdown(&self) {
        let timer = self.inner.pending.lock().timer.take();
        if let Some(timer) = timer {
            timer.abort();
            self.inner.flush_pending();
        }
    }

    fn config_path(&self) -> PathBuf {
        self.inner.primary_path.clone()
    }

    fn backup_path(&self) -> PathBuf {
        self.inner.backup_path.clone()
    }
}

impl<M: ConfigModel> Drop for TomlConfigStore<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Grant world read/write on a newly created primary file. The store targets
/// a machine-wide configuration location, so the first writer must not lock
/// out other local users.
#[cfg(unix)]
fn grant_world_access(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o666))?;
    Ok(())
}

#[cfg(not(unix))]
fn grant_world_access(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Resolve the OS machine-wide shared configuration directory.
fn shared_config_dir(app_name: &str) -> Result<PathBuf, StoreError> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("ProgramData")
            .map(|p| PathBuf::from(p).join(app_name))
            .or_else(|| dirs::config_dir().map(|p| p.join(app_name)))
            .ok_or_else(|| {
                StoreError::Config(
                    "Could not resolve shared configuration directory".to_string(),
                )
            })
    }

    #[cfg(target_os = "macos")]
    {
        Ok(PathBuf::from("/Library/Application Support").join(app_name))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Ok(PathBuf::from("/var/lib").join(app_name))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    {
        dirs::config_dir()
            .map(|p| p.join(app_name))
            .ok_or_else(|| {
                StoreError::Config(
                    "Could not resolve shared configuration directory".to_string(),
                )
            })
    }
}
