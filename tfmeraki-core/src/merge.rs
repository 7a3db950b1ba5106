//! Merge - Reconcile a desired record with the record the API returned
//!
//! Both sides are reflections of the same model type and are walked together,
//! field by field:
//!
//! - scalars: the observed value wins unless it is vacant
//! - nested records: a present observed record is merged recursively (a null
//!   desired record counts as empty); a null observed record leaves the desired
//!   record untouched
//! - lists: a non-vacant observed list replaces the desired one wholesale
//!
//! What counts as vacant depends on the [`Precedence`].

use log::debug;

use crate::reflect::Reflect;
use crate::resource::{Record, Value};

/// Which side of the merge wins, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// After create/update. Observed wins unless it is unknown, null, an empty
    /// string or an empty collection, so write-only attributes the API never
    /// echoes survive. Unknowns left over resolve to null.
    PreferObserved,
    /// After a plain read. Observed wins whenever it carries a value, including
    /// empty ones; attributes only the desired side carries (pinned path
    /// parameters, write-only fields) are kept verbatim.
    PreferObservedKeepDesiredExtras,
}

impl Precedence {
    fn is_vacant(self, observed: &Value) -> bool {
        match self {
            Precedence::PreferObserved => observed.is_absent() || observed.is_empty_value(),
            Precedence::PreferObservedKeepDesiredExtras => observed.is_absent(),
        }
    }

    fn retain(self, desired: &Value) -> Value {
        match self {
            Precedence::PreferObserved => resolve_unknowns(desired),
            Precedence::PreferObservedKeepDesiredExtras => desired.clone(),
        }
    }
}

/// Desired and observed disagree on the kind of a concrete value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("state merge shape mismatch at '{path}': desired is {desired}, observed is {observed}")]
pub struct ShapeMismatch {
    pub path: String,
    pub desired: &'static str,
    pub observed: &'static str,
}

/// Merge two value trees
///
/// # Panics
///
/// Panics when both sides hold concrete values of different kinds at the same
/// field. Desired and observed come from the same model type, so this can only
/// be a bug in a generated model. Use [`try_merge`] for untyped input.
pub fn merge(desired: &Value, observed: &Value, precedence: Precedence) -> Value {
    try_merge(desired, observed, precedence).unwrap_or_else(|e| panic!("{}", e))
}

/// Merge two value trees, reporting a kind mismatch instead of panicking
pub fn try_merge(desired: &Value, observed: &Value, precedence: Precedence) -> Result<Value, ShapeMismatch> {
    let mut path = Vec::new();
    merge_at(desired, observed, precedence, &mut path)
}

/// Merge two records field by field
///
/// # Panics
///
/// Same as [`merge`].
pub fn merge_records(desired: &Record, observed: &Record, precedence: Precedence) -> Record {
    let mut path = Vec::new();
    merge_fields(desired, observed, precedence, &mut path).unwrap_or_else(|e| panic!("{}", e))
}

/// Merge two typed models and rebuild the model type
pub fn merge_typed<T: Reflect>(desired: &T, observed: &T, precedence: Precedence) -> T {
    let merged = merge(&desired.reflect(), &observed.reflect(), precedence);
    T::reify(&merged).unwrap_or_else(|e| panic!("merged record no longer fits its model type: {}", e))
}

/// Reconcile after a create or update
pub fn merge_after_write<T: Reflect>(desired: &T, observed: &T) -> T {
    merge_typed(desired, observed, Precedence::PreferObserved)
}

/// Reconcile after a read
pub fn merge_after_read<T: Reflect>(desired: &T, observed: &T) -> T {
    merge_typed(desired, observed, Precedence::PreferObservedKeepDesiredExtras)
}

fn merge_at(
    desired: &Value,
    observed: &Value,
    precedence: Precedence,
    path: &mut Vec<String>,
) -> Result<Value, ShapeMismatch> {
    if precedence.is_vacant(observed) {
        return Ok(precedence.retain(desired));
    }

    match (desired, observed) {
        (Value::Record(d), Value::Record(o)) => Ok(Value::Record(merge_fields(d, o, precedence, path)?)),
        (d, Value::Record(o)) if d.is_absent() => {
            Ok(Value::Record(merge_fields(&Record::new(), o, precedence, path)?))
        }
        (d, o) if d.is_absent() || same_kind(d, o) => Ok(o.clone()),
        (d, o) => Err(ShapeMismatch {
            path: display_path(path),
            desired: d.kind(),
            observed: o.kind(),
        }),
    }
}

fn merge_fields(
    desired: &Record,
    observed: &Record,
    precedence: Precedence,
    path: &mut Vec<String>,
) -> Result<Record, ShapeMismatch> {
    let mut merged = Record::new();

    for (name, d) in desired.iter() {
        path.push(name.to_string());
        let value = match observed.get(name) {
            Some(o) => merge_at(d, o, precedence, path)?,
            None => precedence.retain(d),
        };
        path.pop();
        merged.insert(name, value);
    }

    for (name, o) in observed.iter() {
        if desired.contains(name) {
            continue;
        }
        path.push(name.to_string());
        let value = merge_at(&Value::Null, o, precedence, path)?;
        path.pop();
        merged.insert(name, value);
    }

    if path.is_empty() {
        debug!("merged {} fields with {:?}", merged.len(), precedence);
    }
    Ok(merged)
}

fn same_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::String(_), Value::String(_))
            | (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::Bool(_), Value::Bool(_))
            | (Value::List(_), Value::List(_))
            | (Value::Record(_), Value::Record(_))
    )
}

fn resolve_unknowns(value: &Value) -> Value {
    match value {
        Value::Unknown => Value::Null,
        Value::List(items) => Value::List(items.iter().map(resolve_unknowns).collect()),
        Value::Record(record) => Value::Record(
            record
                .iter()
                .map(|(k, v)| (k.to_string(), resolve_unknowns(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attr;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Area {
            area_id: Attr<String>,
            cost: Attr<i64>,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct OspfV3 {
            enabled: Attr<bool>,
            area: Option<Box<Area>>,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Interface {
            serial: Attr<String>,
            interface_id: Attr<String>,
            name: Attr<String>,
            subnet: Attr<String>,
            vlan_id: Attr<i64>,
            certificate: Attr<String>,
            tags: Vec<Attr<String>>,
            ospf_v3: Option<Box<OspfV3>>,
        }
    }

    fn text(s: &str) -> Attr<String> {
        Attr::Known(s.to_string())
    }

    fn full_interface() -> Interface {
        Interface {
            serial: text("Q2SW-0001"),
            interface_id: text("1234"),
            name: text("L3 core"),
            subnet: text("10.0.0.0/24"),
            vlan_id: Attr::Known(100),
            certificate: text("-----BEGIN CERTIFICATE-----"),
            tags: vec![text("core"), text("prod")],
            ospf_v3: Some(Box::new(OspfV3 {
                enabled: Attr::Known(true),
                area: Some(Box::new(Area {
                    area_id: text("0"),
                    cost: Attr::Known(10),
                })),
            })),
        }
    }

    #[test]
    fn merging_a_record_with_itself_is_identity() {
        let record = full_interface();
        assert_eq!(merge_after_write(&record, &record), record);
        assert_eq!(merge_after_read(&record, &record), record);
    }

    #[test]
    fn post_write_keeps_exclusive_fields_of_both_sides() {
        let desired = Interface {
            name: text("L3 core"),
            subnet: text("10.0.0.0/24"),
            certificate: text("-----BEGIN CERTIFICATE-----"),
            interface_id: Attr::Unknown,
            ..Default::default()
        };
        let observed = Interface {
            name: text("L3 Core"),
            interface_id: text("1234"),
            vlan_id: Attr::Known(100),
            ..Default::default()
        };

        let merged = merge_after_write(&desired, &observed);

        assert_eq!(merged.certificate, text("-----BEGIN CERTIFICATE-----"));
        assert_eq!(merged.subnet, text("10.0.0.0/24"));
        assert_eq!(merged.interface_id, text("1234"));
        assert_eq!(merged.vlan_id, Attr::Known(100));
        assert_eq!(merged.name, text("L3 Core"));
    }

    #[test]
    fn post_write_resolves_leftover_unknowns_to_null() {
        let desired = Interface {
            interface_id: Attr::Unknown,
            ospf_v3: Some(Box::new(OspfV3 {
                enabled: Attr::Unknown,
                area: None,
            })),
            ..Default::default()
        };
        let observed = Interface::default();

        let merged = merge_after_write(&desired, &observed);
        assert_eq!(merged.interface_id, Attr::Null);
        assert_eq!(merged.ospf_v3.unwrap().enabled, Attr::Null);
    }

    #[test]
    fn post_write_treats_empty_values_as_not_returned() {
        let desired = Interface {
            certificate: text("pem"),
            tags: vec![text("core")],
            ..Default::default()
        };
        let observed = Interface {
            certificate: text(""),
            tags: vec![],
            ..Default::default()
        };

        let merged = merge_after_write(&desired, &observed);
        assert_eq!(merged.certificate, text("pem"));
        assert_eq!(merged.tags, vec![text("core")]);
    }

    #[test]
    fn observed_list_replaces_desired_list_wholesale() {
        let desired = Interface {
            tags: vec![text("a"), text("b"), text("c")],
            ..Default::default()
        };
        let observed = Interface {
            tags: vec![text("z")],
            ..Default::default()
        };

        assert_eq!(merge_after_write(&desired, &observed).tags, vec![text("z")]);
        assert_eq!(merge_after_read(&desired, &observed).tags, vec![text("z")]);
    }

    #[test]
    fn read_keeps_pinned_path_parameters() {
        let prior_state = Interface {
            serial: text("Q2SW-0001"),
            interface_id: text("1234"),
            name: text("L3 core"),
            ..Default::default()
        };
        let observed = Interface {
            interface_id: text("1234"),
            name: text("L3 core renamed"),
            subnet: text("10.1.0.0/24"),
            ..Default::default()
        };

        let merged = merge_after_read(&prior_state, &observed);
        assert_eq!(merged.serial, text("Q2SW-0001"));
        assert_eq!(merged.name, text("L3 core renamed"));
        assert_eq!(merged.subnet, text("10.1.0.0/24"));
    }

    #[test]
    fn read_accepts_empty_values_from_the_api() {
        let prior_state = Interface {
            subnet: text("10.0.0.0/24"),
            tags: vec![text("core")],
            ..Default::default()
        };
        let observed = Interface {
            subnet: text(""),
            tags: vec![],
            ..Default::default()
        };

        let merged = merge_after_read(&prior_state, &observed);
        assert_eq!(merged.subnet, text(""));
        assert!(merged.tags.is_empty());
    }

    #[test]
    fn null_observed_sub_object_keeps_desired_three_levels_deep() {
        let desired = full_interface();
        let observed = Interface {
            name: text("L3 core"),
            ospf_v3: None,
            ..Default::default()
        };

        for merged in [
            merge_after_write(&desired, &observed),
            merge_after_read(&desired, &observed),
        ] {
            assert_eq!(merged.ospf_v3, desired.ospf_v3);
        }

        let observed = Interface {
            ospf_v3: Some(Box::new(OspfV3 {
                enabled: Attr::Known(false),
                area: None,
            })),
            ..Default::default()
        };
        let merged = merge_after_write(&desired, &observed);
        let ospf = merged.ospf_v3.unwrap();
        assert_eq!(ospf.enabled, Attr::Known(false));
        assert_eq!(
            ospf.area,
            Some(Box::new(Area {
                area_id: text("0"),
                cost: Attr::Known(10),
            }))
        );
    }

    #[test]
    fn null_desired_sub_object_takes_observed() {
        let desired = Interface::default();
        let observed = full_interface();

        let merged = merge_after_write(&desired, &observed);
        assert_eq!(merged.ospf_v3, observed.ospf_v3);
    }

    #[test]
    fn dynamic_records_keep_fields_from_both_sides() {
        let desired = Record::new()
            .with_field("network_id", "N_1")
            .with_field("name", "guest");
        let observed = Record::new()
            .with_field("name", "Guest")
            .with_field("id", "42");

        let merged = merge_records(&desired, &observed, Precedence::PreferObservedKeepDesiredExtras);
        let names: Vec<&str> = merged.field_names().collect();
        assert_eq!(names, vec!["network_id", "name", "id"]);
        assert_eq!(merged.get("name"), Some(&Value::from("Guest")));
    }

    #[test]
    fn numbers_merge_across_int_and_float() {
        let merged = merge(&Value::Int(1), &Value::Float(1.5), Precedence::PreferObserved);
        assert_eq!(merged, Value::Float(1.5));
    }

    #[test]
    #[should_panic(expected = "state merge shape mismatch at 'vlan_id'")]
    fn kind_mismatch_panics() {
        let desired = Value::Record(Record::new().with_field("vlan_id", 10i64));
        let observed = Value::Record(Record::new().with_field("vlan_id", "ten"));
        merge(&desired, &observed, Precedence::PreferObserved);
    }

    #[test]
    fn try_merge_reports_the_mismatched_path() {
        let desired = Value::Record(
            Record::new().with_field("ospf", Record::new().with_field("cost", 10i64)),
        );
        let observed = Value::Record(
            Record::new().with_field("ospf", Record::new().with_field("cost", true)),
        );

        let err = try_merge(&desired, &observed, Precedence::PreferObservedKeepDesiredExtras).unwrap_err();
        assert_eq!(err.path, "ospf.cost");
        assert_eq!(err.desired, "int");
        assert_eq!(err.observed, "bool");
    }
}
