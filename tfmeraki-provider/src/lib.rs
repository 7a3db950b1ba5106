//! tfmeraki Dashboard Provider
//!
//! Resource bindings for the cloud-managed networking Dashboard API.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings resolved from configuration and environment
//! - `client` - HTTP transport seam and its reqwest implementation
//! - `resources` - Resource models, their API bindings and the type catalog
//! - `provider` - MerakiProvider handing out per-resource reconcilers
//! - `utils` - Helpers for mapping models to and from request bodies

pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod utils;

// Re-export main types
pub use client::{DashboardClient, HttpTransport};
pub use config::{ConfigError, ProviderConfig, ProviderSettings};
pub use provider::MerakiProvider;
pub use resources::resource_types;
