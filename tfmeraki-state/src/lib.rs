//! tfmeraki State Management
//!
//! Persists the records produced by the reconciler so the next refresh can
//! merge against them.
//!
//! # Overview
//!
//! - **StateFile**: all managed resources, with serial and lineage
//! - **StateBackend**: storage trait; only the local file backend ships
//! - **LockInfo**: lock held while state is being modified
//!
//! # Example
//!
//! ```ignore
//! use tfmeraki_state::{create_backend, BackendConfig, LockInfo, ResourceState};
//!
//! let config = BackendConfig::local().with_attribute("path", "tfmeraki.state.json");
//! let backend = create_backend(&config).await?;
//!
//! let lock = backend.acquire_lock(LockInfo::new("apply").with_target(id.to_string())).await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! state.upsert_resource(ResourceState::from_model(id, &merged));
//! state.increment_serial();
//! backend.write_state(&state).await?;
//!
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
