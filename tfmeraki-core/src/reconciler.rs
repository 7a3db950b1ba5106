//! Reconciler - Drive create/read/update/delete for any resource
//!
//! The Reconciler is where the selector, the matcher and the merger meet. For a
//! given model it decides which lookup applies, recovers the remote id by name
//! when needed, issues the call through the [`ResourceApi`] and merges the
//! object read back into the state that gets persisted.

use log::{debug, info};

use crate::matcher::{Comparison, DuplicatePolicy, RecordMatcher, require_string};
use crate::merge::{merge_after_read, merge_after_write};
use crate::provider::{Lookup, ProviderError, ProviderResult, ResourceApi};
use crate::resource::ResourceId;

/// Resource name shown in errors when the model carries no name
const UNNAMED: &str = "<unnamed>";

/// Reconciler configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilerConfig {
    /// How names in list responses are compared with the configured name
    pub comparison: Comparison,
    /// What to do when several remote objects share the configured name
    pub duplicates: DuplicatePolicy,
}

/// Outcome of an upsert-by-name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// An object with the configured name exists under this id
    Existing { id: String },
    /// No object with the configured name exists
    Absent,
}

/// How an existing remote object is addressed
enum Address {
    Path,
    Id(String),
}

impl Address {
    fn id(&self) -> Option<&str> {
        match self {
            Address::Path => None,
            Address::Id(id) => Some(id.as_str()),
        }
    }
}

/// Runs resource lifecycles against a [`ResourceApi`]
pub struct Reconciler<A: ResourceApi> {
    api: A,
    config: ReconcilerConfig,
}

impl<A: ResourceApi> Reconciler<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Look the model up by name in the collection
    ///
    /// Not finding it is not an error: it means the object has to be created.
    pub async fn locate(&self, model: &A::Model) -> ProviderResult<Located> {
        self.locate_by_name(model)
            .await
            .map_err(|e| self.annotate(e, model))
    }

    /// Create the object, or adopt and update an existing one with the same name
    pub async fn create(&self, desired: &A::Model) -> ProviderResult<A::Model> {
        self.create_inner(desired)
            .await
            .map_err(|e| self.annotate(e, desired))
    }

    /// Refresh state; `None` means the object is gone and must leave state
    pub async fn read(&self, state: &A::Model) -> ProviderResult<Option<A::Model>> {
        self.read_inner(state)
            .await
            .map_err(|e| self.annotate(e, state))
    }

    pub async fn update(&self, plan: &A::Model) -> ProviderResult<A::Model> {
        self.update_inner(plan)
            .await
            .map_err(|e| self.annotate(e, plan))
    }

    /// Delete the object; deleting something already gone succeeds
    pub async fn delete(&self, state: &A::Model) -> ProviderResult<()> {
        self.delete_inner(state)
            .await
            .map_err(|e| self.annotate(e, state))
    }

    async fn create_inner(&self, desired: &A::Model) -> ProviderResult<A::Model> {
        // The written object must be found again afterwards
        let lookup = *self.api.lookups(desired).select()?;
        self.ensure_addressable(desired, lookup)?;

        match self.locate_by_name(desired).await? {
            Located::Existing { id } => {
                info!(
                    "{} '{}' already exists with id {}, updating it",
                    self.api.type_name(),
                    self.api.match_target(desired).unwrap_or_default(),
                    id
                );
                self.api.update(desired, Some(id.as_str())).await?;
            }
            Located::Absent => {
                info!("creating {}", self.api.type_name());
                self.api.create(desired).await?;
            }
        }

        let observed = self
            .fetch(desired)
            .await?
            .ok_or_else(|| ProviderError::new("object not found after it was written"))?;
        Ok(merge_after_write(desired, &observed))
    }

    async fn read_inner(&self, state: &A::Model) -> ProviderResult<Option<A::Model>> {
        match self.fetch(state).await? {
            Some(observed) => Ok(Some(merge_after_read(state, &observed))),
            None => {
                info!(
                    "{} no longer exists remotely, dropping it from state",
                    self.api.type_name()
                );
                Ok(None)
            }
        }
    }

    async fn update_inner(&self, plan: &A::Model) -> ProviderResult<A::Model> {
        let address = self
            .address(plan)
            .await?
            .ok_or_else(|| ProviderError::new("object to update no longer exists"))?;

        info!("updating {}", self.api.type_name());
        self.api.update(plan, address.id()).await?;

        let observed = self
            .api
            .get(plan, address.id())
            .await?
            .ok_or_else(|| ProviderError::new("object not found after it was written"))?;
        Ok(merge_after_write(plan, &observed))
    }

    async fn delete_inner(&self, state: &A::Model) -> ProviderResult<()> {
        match self.address(state).await? {
            Some(address) => {
                info!("deleting {}", self.api.type_name());
                self.api.delete(state, address.id()).await
            }
            None => {
                debug!("{} already absent, nothing to delete", self.api.type_name());
                Ok(())
            }
        }
    }

    async fn locate_by_name(&self, model: &A::Model) -> ProviderResult<Located> {
        let Some(target) = self.api.match_target(model) else {
            return Ok(Located::Absent);
        };

        let listing = self.api.list(model).await?;
        let matcher = RecordMatcher::new(self.api.match_field())
            .with_comparator(self.config.comparison)
            .with_duplicates(self.config.duplicates);

        match matcher.find(&listing, &target)? {
            Some(record) => {
                let id = require_string(record, self.api.id_field())?;
                Ok(Located::Existing { id: id.to_string() })
            }
            None => Ok(Located::Absent),
        }
    }

    fn ensure_addressable(&self, model: &A::Model, lookup: Lookup) -> ProviderResult<()> {
        if lookup == Lookup::Collection && self.api.match_target(model).is_none() {
            return Err(ProviderError::configuration(format!(
                "{} must be set to look this object up",
                self.api.match_field()
            )));
        }
        Ok(())
    }

    async fn address(&self, model: &A::Model) -> ProviderResult<Option<Address>> {
        let lookup = *self.api.lookups(model).select()?;
        self.ensure_addressable(model, lookup)?;
        match lookup {
            Lookup::Item => Ok(Some(Address::Path)),
            Lookup::Collection => {
                match self.locate_by_name(model).await? {
                    Located::Existing { id } => Ok(Some(Address::Id(id))),
                    Located::Absent => Ok(None),
                }
            }
        }
    }

    async fn fetch(&self, model: &A::Model) -> ProviderResult<Option<A::Model>> {
        match self.address(model).await? {
            Some(address) => self.api.get(model, address.id()).await,
            None => Ok(None),
        }
    }

    fn annotate(&self, error: ProviderError, model: &A::Model) -> ProviderError {
        if error.resource_id.is_some() {
            return error;
        }
        let name = self
            .api
            .match_target(model)
            .unwrap_or_else(|| UNNAMED.to_string());
        error.for_resource(ResourceId::new(self.api.type_name(), name))
    }
}
