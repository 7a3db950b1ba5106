//! Provider - Error type and the per-resource API seam
//!
//! A [`ResourceApi`] binds one model type to the remote calls that manage it.
//! The [`Reconciler`](crate::reconciler::Reconciler) drives those calls
//! generically: which lookup to use, how to find an object by name, and how to
//! merge what the API returns into state.

use std::future::Future;
use std::pin::Pin;

use crate::matcher::{MatchError, MatchField};
use crate::reflect::{Reflect, ReflectError};
use crate::resource::{ResourceId, Value};
use crate::selector::{MethodSelector, SelectError};

/// Broad classification of a provider error, used to build diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration does not carry enough information to act on
    Configuration,
    /// An identifier in an API response is missing or malformed
    Identifier,
    /// The remote API call failed
    Api,
    /// A model does not fit its own reflection
    Internal,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    /// An API failure
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Api,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::Configuration)
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<SelectError> for ProviderError {
    fn from(e: SelectError) -> Self {
        ProviderError::configuration(e.to_string()).with_cause(e)
    }
}

impl From<MatchError> for ProviderError {
    fn from(e: MatchError) -> Self {
        let kind = match e {
            MatchError::FieldNotString { .. } | MatchError::EmptyIdentifier { .. } => ErrorKind::Identifier,
            MatchError::FieldMissing { .. }
            | MatchError::NotARecord { .. }
            | MatchError::NoList { .. }
            | MatchError::Ambiguous { .. } => ErrorKind::Configuration,
        };
        ProviderError::new(e.to_string()).with_kind(kind).with_cause(e)
    }
}

impl From<ReflectError> for ProviderError {
    fn from(e: ReflectError) -> Self {
        ProviderError::new(e.to_string())
            .with_kind(ErrorKind::Internal)
            .with_cause(e)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Candidate ways of reading a single remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// List the collection, find the object by name, then fetch it by id
    Collection,
    /// Fetch the object directly from the path parameters in the model
    Item,
}

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "appliance_vlan")
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }
}

/// Remote calls for one resource type
///
/// `list` returns the raw list response; it may be the list itself or a record
/// wrapping it. `get` returns `None` when the object does not exist.
pub trait ResourceApi: Send + Sync {
    type Model: Reflect + Clone + Send + Sync;

    /// Resource type name (e.g., "appliance_vlan")
    fn type_name(&self) -> &'static str;

    /// Candidate lookups, least specific first
    fn lookups(&self, model: &Self::Model) -> MethodSelector<Lookup>;

    /// Value searched for in list responses; `None` if the model has no name yet
    fn match_target(&self, model: &Self::Model) -> Option<String>;

    fn match_field(&self) -> MatchField {
        MatchField::Name
    }

    /// Field of a list element that holds the remote identifier
    fn id_field(&self) -> MatchField {
        MatchField::Id
    }

    fn list<'a>(&'a self, model: &'a Self::Model) -> BoxFuture<'a, ProviderResult<Value>>;

    fn get<'a>(
        &'a self,
        model: &'a Self::Model,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Option<Self::Model>>>;

    fn create<'a>(&'a self, model: &'a Self::Model) -> BoxFuture<'a, ProviderResult<()>>;

    fn update<'a>(
        &'a self,
        model: &'a Self::Model,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete<'a>(
        &'a self,
        model: &'a Self::Model,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
