//! State file structures for persisting merged resource state

use serde::{Deserialize, Serialize};
use tfmeraki_core::reflect::{Reflect, ReflectError, to_record};
use tfmeraki_core::resource::{Record, ResourceId, Value};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of tfmeraki that last modified this state
    pub tfmeraki_version: String,
    /// All managed resources and their current state
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            tfmeraki_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and stamp the current version before a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tfmeraki_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Add or replace a resource
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.id();
        match self.resources.iter_mut().find(|r| r.matches(&id)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Apply the outcome of a read: keep the refreshed record, or drop the
    /// resource when the remote object no longer exists
    ///
    /// Returns true if the resource is still tracked afterwards.
    pub fn apply_read(&mut self, id: &ResourceId, refreshed: Option<&Record>) -> bool {
        match refreshed {
            Some(record) => {
                self.upsert_resource(ResourceState::from_record(id.clone(), record));
                true
            }
            None => {
                self.remove_resource(id);
                false
            }
        }
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "appliance_vlan")
    pub resource_type: String,
    /// Resource name as addressed in configuration
    pub name: String,
    /// Attributes as JSON, in model field order; unknown values are stored as null
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Store a merged record
    pub fn from_record(id: ResourceId, record: &Record) -> Self {
        Self {
            resource_type: id.resource_type,
            name: id.name,
            attributes: record
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        }
    }

    /// Store a typed model
    pub fn from_model<T: Reflect>(id: ResourceId, model: &T) -> Self {
        Self::from_record(id, &to_record(model))
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.resource_type.clone(), self.name.clone())
    }

    pub fn to_record(&self) -> Record {
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    /// Load the stored attributes back into a typed model
    pub fn to_model<T: Reflect>(&self) -> Result<T, ReflectError> {
        T::reify(&Value::Record(self.to_record()))
    }

    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfmeraki_core::attr::Attr;

    tfmeraki_core::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Vlan {
            network_id: Attr<String>,
            vlan_id: Attr<String>,
            name: Attr<String>,
            dhcp_lease_time: Attr<String>,
        }
    }

    fn guest() -> ResourceId {
        ResourceId::new("appliance_vlan", "guest")
    }

    #[test]
    fn test_state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn test_upsert_replaces_same_address() {
        let mut state = StateFile::new();

        state.upsert_resource(
            ResourceState::new("appliance_vlan", "guest").with_attribute("subnet", json!("10.0.20.0/24")),
        );
        state.upsert_resource(
            ResourceState::new("appliance_vlan", "guest").with_attribute("subnet", json!("10.0.21.0/24")),
        );
        state.upsert_resource(ResourceState::new("appliance_vlan", "voice"));

        assert_eq!(state.resources.len(), 2);
        assert_eq!(
            state.find_resource(&guest()).unwrap().attributes.get("subnet"),
            Some(&json!("10.0.21.0/24"))
        );
    }

    #[test]
    fn test_remove_resource() {
        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("appliance_vlan", "guest"));

        assert!(state.remove_resource(&guest()).is_some());
        assert!(state.remove_resource(&guest()).is_none());
    }

    #[test]
    fn test_model_round_trip_keeps_field_order() {
        let vlan = Vlan {
            network_id: "N_1".into(),
            vlan_id: "20".into(),
            name: "guest".into(),
            dhcp_lease_time: Attr::Unknown,
        };

        let resource = ResourceState::from_model(guest(), &vlan);
        let keys: Vec<_> = resource.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["network_id", "vlan_id", "name", "dhcp_lease_time"]);
        assert_eq!(resource.attributes["dhcp_lease_time"], json!(null));

        let loaded: Vlan = resource.to_model().unwrap();
        assert_eq!(loaded.name, vlan.name);
        assert_eq!(loaded.dhcp_lease_time, Attr::Null);
    }

    #[test]
    fn test_apply_read_drops_vanished_resource() {
        let mut state = StateFile::new();
        let record = Record::new().with_field("name", "guest");

        assert!(state.apply_read(&guest(), Some(&record)));
        assert_eq!(state.resources.len(), 1);

        assert!(!state.apply_read(&guest(), None));
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_serialization() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("appliance_vlan", "guest").with_attribute("vlan_id", json!("20")),
        );

        let json = serde_json::to_string_pretty(&state).unwrap();
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lineage, state.lineage);
        assert_eq!(deserialized.resources, state.resources);
    }
}
