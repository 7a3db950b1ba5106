//! tfmeraki Core
//!
//! Reconciliation core of a Terraform provider for a cloud-managed networking
//! dashboard API: pick the right lookup, find objects by name, and merge what
//! the API returns into the state Terraform persists.

pub mod attr;
pub mod diagnostics;
pub mod matcher;
pub mod merge;
pub mod provider;
pub mod reconciler;
pub mod reflect;
pub mod resource;
pub mod selector;

pub use attr::Attr;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use matcher::{
    Comparator, Comparison, DuplicatePolicy, MatchError, MatchField, RecordMatcher, find_record,
    require_string,
};
pub use merge::{
    Precedence, ShapeMismatch, merge, merge_after_read, merge_after_write, merge_records, try_merge,
};
pub use provider::{
    BoxFuture, ErrorKind, Lookup, ProviderError, ProviderResult, ResourceApi, ResourceType,
};
pub use reconciler::{Located, Reconciler, ReconcilerConfig};
pub use reflect::{Reflect, ReflectError};
pub use resource::{Record, ResourceId, Value};
pub use selector::{MethodSelector, PresenceSignature, SelectError, select_index};
