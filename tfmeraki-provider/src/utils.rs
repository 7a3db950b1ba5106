//! Utility functions for moving models on and off the wire

use heck::{ToLowerCamelCase, ToSnakeCase};
use tfmeraki_core::attr::Attr;
use tfmeraki_core::provider::{ProviderError, ProviderResult};
use tfmeraki_core::reflect::{Reflect, to_record};
use tfmeraki_core::resource::{Record, Value};

/// Model field and API key pairs for fields whose names do not follow the
/// usual camelCase mapping, e.g. `("vlan_id", "id")`
pub type Renames = &'static [(&'static str, &'static str)];

/// Read a path parameter out of the model
pub fn path_param<'a>(value: &'a Attr<String>, name: &str) -> ProviderResult<&'a str> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ProviderError::configuration(format!(
            "{} must be known to call the API",
            name
        ))),
    }
}

/// Remote id of an object: the id found by name when there is one, otherwise
/// the id already held in the model
pub fn resolve_id<'a>(
    found: Option<&'a str>,
    value: &'a Attr<String>,
    name: &str,
) -> ProviderResult<&'a str> {
    match found {
        Some(id) => Ok(id),
        None => path_param(value, name),
    }
}

/// Percent-encode one path segment
pub fn segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Convert a value tree to the JSON the API expects
///
/// Record keys become camelCase. Unknown and null fields are left out so the
/// API keeps its own defaults.
pub fn to_wire(value: &Value) -> serde_json::Value {
    match value {
        Value::Record(record) => serde_json::Value::Object(
            record
                .iter()
                .filter(|(_, v)| !v.is_absent())
                .map(|(k, v)| (k.to_lower_camel_case(), to_wire(v)))
                .collect(),
        ),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_wire).collect()),
        other => other.to_json(),
    }
}

/// Convert an API response to a value tree with snake_case keys
pub fn from_wire(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Object(map) => Value::Record(
            map.iter()
                .map(|(k, v)| (k.to_snake_case(), from_wire(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_wire).collect()),
        other => Value::from_json(other),
    }
}

/// Build a request body from a model
///
/// `path_fields` travel in the URL and are left out of the body.
pub fn request_body<M: Reflect>(
    model: &M,
    path_fields: &[&str],
    renames: Renames,
) -> serde_json::Value {
    let record: Record = to_record(model)
        .iter()
        .filter(|(name, _)| !path_fields.contains(name))
        .map(|(name, value)| (rename(name, renames, true), value.clone()))
        .collect();
    to_wire(&Value::Record(record))
}

/// Decode an API object into a model
pub fn decode<M: Reflect>(json: &serde_json::Value, renames: Renames) -> ProviderResult<M> {
    let value = match from_wire(json) {
        Value::Record(record) => Value::Record(
            record
                .iter()
                .map(|(name, value)| (rename(name, renames, false), value.clone()))
                .collect(),
        ),
        other => {
            return Err(ProviderError::new(format!(
                "expected an object in the response, got {}",
                other.kind()
            )));
        }
    };
    Ok(M::reify(&value)?)
}

/// Map a field name between the model and the wire
///
/// Names are snake_case on both sides at this point; the wire side is
/// camelCased afterwards by [`to_wire`].
fn rename(name: &str, renames: Renames, to_wire: bool) -> String {
    renames
        .iter()
        .find_map(|(model, wire)| {
            let wire = wire.to_snake_case();
            if to_wire && *model == name {
                Some(wire)
            } else if !to_wire && wire == name {
                Some(model.to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| name.to_string())
}
