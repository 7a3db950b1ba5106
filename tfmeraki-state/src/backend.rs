//! State backend trait and error types

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tfmeraki_core::resource::Value;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// The stored state belongs to another lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    /// The state being written is older than the stored one
    #[error("Stale state: stored serial is {stored}, writing serial {writing}")]
    StaleSerial { stored: u64, writing: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.describe(),
        }
    }

    pub fn unsupported_backend(backend_type: impl Into<String>) -> Self {
        Self::UnsupportedBackend(backend_type.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Trait for state storage backends
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state; `None` if nothing has been written yet
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state
    ///
    /// The serial must have been incremented past the stored one, and the
    /// lineage must match the stored state's.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Take the given lock, failing while another unexpired lock is held
    async fn acquire_lock(&self, lock: LockInfo) -> BackendResult<LockInfo>;

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Release a lock by ID regardless of who holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Prepare the storage location
    async fn init(&self) -> BackendResult<()>;
}

/// Configuration for a state backend
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Backend type (currently only "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

impl BackendConfig {
    pub fn local() -> Self {
        Self {
            backend_type: "local".to_string(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.attributes.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_locked() {
        let lock = LockInfo::new("apply");
        match BackendError::locked(&lock) {
            BackendError::Locked {
                lock_id,
                who,
                operation,
            } => {
                assert_eq!(lock_id, lock.id);
                assert_eq!(who, lock.who);
                assert_eq!(operation, "apply");
            }
            other => panic!("Expected Locked error, got {other:?}"),
        }
    }

    #[test]
    fn test_locked_error_names_target() {
        let lock = LockInfo::new("state rm").with_target("appliance_vlan.guest");
        let message = BackendError::locked(&lock).to_string();
        assert!(message.contains("operation: state rm appliance_vlan.guest"));
    }

    #[test]
    fn test_backend_error_display() {
        let error = BackendError::unsupported_backend("s3");
        assert_eq!(error.to_string(), "Unsupported backend type: s3");

        let error = BackendError::StaleSerial {
            stored: 4,
            writing: 3,
        };
        assert_eq!(
            error.to_string(),
            "Stale state: stored serial is 4, writing serial 3"
        );
    }

    #[test]
    fn test_config_accessors() {
        let config = BackendConfig::local()
            .with_attribute("path", "state/tfmeraki.state.json")
            .with_attribute("create_dirs", true);

        assert_eq!(config.get_string("path"), Some("state/tfmeraki.state.json"));
        assert!(config.get_bool_or("create_dirs", false));
        assert!(!config.get_bool_or("missing", false));
        assert_eq!(config.get_string("create_dirs"), None);
    }
}
