//! Lock information for state backend locking

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default lock timeout in seconds (15 minutes)
pub const DEFAULT_LOCK_TIMEOUT_SECS: i64 = 900;

/// A held state lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// Operation holding the lock (e.g., "apply", "refresh", "state rm")
    pub operation: String,
    /// username@hostname
    pub who: String,
    /// Resource address the operation is limited to; `None` locks the whole state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_timeout(operation, DEFAULT_LOCK_TIMEOUT_SECS)
    }

    pub fn with_timeout(operation: impl Into<String>, timeout_secs: i64) -> Self {
        let created = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            who: lock_owner(),
            target: None,
            created,
            expires: created + Duration::seconds(timeout_secs),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Operation and, when set, the resource it touches (e.g. "state rm appliance_vlan.guest")
    pub fn describe(&self) -> String {
        match &self.target {
            Some(target) => format!("{} {}", self.operation, target),
            None => self.operation.clone(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }

    pub fn time_remaining(&self) -> Duration {
        self.expires - Utc::now()
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} held by {} for {} since {}",
            self.id,
            self.who,
            self.describe(),
            self.created.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

fn lock_owner() -> String {
    let username = ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "unknown".to_string());

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{}@{}", username, hostname)
}
