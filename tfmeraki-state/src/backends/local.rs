//! Local file backend for state storage
//!
//! State lives in a JSON file (default: tfmeraki.state.json) next to a
//! `.lock` file used for locking. Writes go through a temporary file and a
//! rename so a crash never leaves a truncated state behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

/// Local file backend
pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
    create_dirs: bool,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "tfmeraki.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
            create_dirs: false,
        }
    }

    /// Attributes: `path` (state file), `create_dirs` (create missing parent
    /// directories on init)
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = match config.attributes.get("path") {
            None => PathBuf::from(Self::DEFAULT_STATE_FILE),
            Some(value) => match value.as_str() {
                Some(path) if !path.is_empty() => PathBuf::from(path),
                _ => {
                    return Err(BackendError::configuration(
                        "local backend 'path' must be a non-empty string",
                    ));
                }
            },
        };

        let mut backend = Self::with_path(path);
        backend.create_dirs = config.get_bool_or("create_dirs", false);
        Ok(backend)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn read_lock(&self) -> BackendResult<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.lock_path)
            .map_err(|e| BackendError::Io(format!("Failed to read lock file: {}", e)))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse lock file: {}", e)))
    }

    fn remove_lock(&self) -> BackendResult<()> {
        std::fs::remove_file(&self.lock_path)
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        if !self.state_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.state_path)
            .map_err(|e| BackendError::Io(format!("Failed to read state file: {}", e)))?;

        let state: StateFile = serde_json::from_str(&content).map_err(|e| {
            BackendError::InvalidState(format!("Failed to parse state file: {}", e))
        })?;

        if state.version > StateFile::CURRENT_VERSION {
            return Err(BackendError::InvalidState(format!(
                "state file version {} is newer than supported version {}",
                state.version,
                StateFile::CURRENT_VERSION
            )));
        }

        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            if stored.lineage != state.lineage {
                return Err(BackendError::LineageMismatch {
                    expected: stored.lineage,
                    actual: state.lineage.clone(),
                });
            }
            if state.serial <= stored.serial {
                return Err(BackendError::StaleSerial {
                    stored: stored.serial,
                    writing: state.serial,
                });
            }
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            BackendError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        let tmp_path = self.state_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        std::fs::rename(&tmp_path, &self.state_path)
            .map_err(|e| BackendError::Io(format!("Failed to replace state file: {}", e)))?;

        debug!(
            "wrote state serial {} to {}",
            state.serial,
            self.state_path.display()
        );
        Ok(())
    }

    async fn acquire_lock(&self, lock: LockInfo) -> BackendResult<LockInfo> {
        // An unreadable lock file is treated like an expired one
        if let Ok(Some(existing)) = self.read_lock()
            && !existing.is_expired()
        {
            return Err(BackendError::locked(&existing));
        }

        let content = serde_json::to_string_pretty(&lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;

        std::fs::write(&self.lock_path, content)
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;

        debug!("acquired lock {} for {}", lock.id, lock.describe());
        Ok(lock)
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = self
            .read_lock()?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;

        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }

        self.remove_lock()
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !self.lock_path.exists() {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }

        if let Ok(Some(existing)) = self.read_lock()
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }

        self.remove_lock()
    }

    async fn init(&self) -> BackendResult<()> {
        let Some(parent) = self.state_path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }
        if !self.create_dirs {
            return Err(BackendError::configuration(format!(
                "state directory {} does not exist",
                parent.display()
            )));
        }
        std::fs::create_dir_all(parent)
            .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tfmeraki_core::resource::Value;

    #[tokio::test]
    async fn test_local_backend_read_write() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read_state = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read_state.serial, 1);
        assert_eq!(read_state.lineage, state.lineage);
    }

    #[tokio::test]
    async fn test_stale_and_foreign_writes_are_rejected() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let mut state = StateFile::new();
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let result = backend.write_state(&state).await;
        assert!(matches!(
            result,
            Err(BackendError::StaleSerial {
                stored: 1,
                writing: 1
            })
        ));

        let mut foreign = StateFile::new();
        foreign.serial = 5;
        let result = backend.write_state(&foreign).await;
        assert!(matches!(result, Err(BackendError::LineageMismatch { .. })));
    }

    #[tokio::test]
    async fn test_newer_state_version_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        let mut state = StateFile::new();
        state.version = StateFile::CURRENT_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let result = LocalBackend::with_path(path).read_state().await;
        assert!(matches!(result, Err(BackendError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_local_backend_locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend
            .acquire_lock(LockInfo::new("state rm").with_target("appliance_vlan.guest"))
            .await
            .unwrap();
        assert_eq!(lock.operation, "state rm");

        let stored = backend.read_lock().unwrap().unwrap();
        assert_eq!(stored.target.as_deref(), Some("appliance_vlan.guest"));

        let result = backend.acquire_lock(LockInfo::new("refresh")).await;
        assert!(matches!(result, Err(BackendError::Locked { .. })));

        let other = LockInfo::new("apply");
        let result = backend.release_lock(&other).await;
        assert!(matches!(result, Err(BackendError::LockMismatch { .. })));

        backend.release_lock(&lock).await.unwrap();

        let lock2 = backend.acquire_lock(LockInfo::new("refresh")).await.unwrap();
        backend.force_unlock(&lock2.id).await.unwrap();
        assert!(matches!(
            backend.force_unlock(&lock2.id).await,
            Err(BackendError::LockNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let stale = LockInfo::with_timeout("apply", -1);
        std::fs::write(&backend.lock_path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = backend.acquire_lock(LockInfo::new("apply")).await.unwrap();
        assert_ne!(lock.id, stale.id);
    }

    #[test]
    fn test_local_backend_from_config() {
        let backend = LocalBackend::from_config(&BackendConfig::local()).unwrap();
        assert_eq!(backend.state_path(), Path::new("tfmeraki.state.json"));

        let config = BackendConfig::local().with_attribute("path", "custom.state.json");
        let backend = LocalBackend::from_config(&config).unwrap();
        assert_eq!(backend.state_path(), Path::new("custom.state.json"));

        let config = BackendConfig::local().with_attribute("path", Value::Int(3));
        assert!(matches!(
            LocalBackend::from_config(&config),
            Err(BackendError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_init_creates_directories_when_asked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/tfmeraki.state.json");

        let config = BackendConfig::local().with_attribute("path", path.to_string_lossy().to_string());
        let backend = LocalBackend::from_config(&config).unwrap();
        assert!(matches!(
            backend.init().await,
            Err(BackendError::Configuration(_))
        ));

        let backend = LocalBackend::from_config(&config.with_attribute("create_dirs", true)).unwrap();
        backend.init().await.unwrap();
        assert!(dir.path().join("nested/dir").is_dir());
    }
}
