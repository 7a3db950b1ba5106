//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use log::debug;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};

/// Create a backend from configuration
pub async fn create_backend(config: &BackendConfig) -> BackendResult<Box<dyn StateBackend>> {
    debug!("creating {} state backend", config.backend_type);
    match config.backend_type.as_str() {
        "local" => {
            let backend = LocalBackend::from_config(config)?;
            backend.init().await?;
            Ok(Box::new(backend))
        }
        other => Err(BackendError::unsupported_backend(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_backend() {
        let config = BackendConfig {
            backend_type: "s3".to_string(),
            ..Default::default()
        };

        match create_backend(&config).await {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "s3"),
            Err(other) => panic!("Expected UnsupportedBackend error, got {other}"),
            Ok(_) => panic!("Expected UnsupportedBackend error"),
        }
    }

    #[tokio::test]
    async fn test_local_backend_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfmeraki.state.json");
        let config = BackendConfig::local().with_attribute("path", path.to_string_lossy().to_string());

        let backend = create_backend(&config).await.unwrap();
        assert!(backend.read_state().await.unwrap().is_none());
    }
}
