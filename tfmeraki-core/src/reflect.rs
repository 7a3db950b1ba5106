//! Reflect - Conversion boundary between typed models and the value tree
//!
//! Every generated model implements [`Reflect`] through the [`record!`](crate::record)
//! macro. The selector, matcher and merger only ever see the resulting [`Value`]
//! tree, so one implementation serves every resource shape.

use crate::attr::Attr;
use crate::resource::{Record, Value};

/// Error raised when a value tree does not fit the type it is reified into
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReflectError {
    #[error("{path}: expected {expected}, got {got}")]
    Mismatch {
        path: String,
        expected: &'static str,
        got: &'static str,
    },
}

impl ReflectError {
    pub fn mismatch(expected: &'static str, got: &Value) -> Self {
        Self::Mismatch {
            path: String::new(),
            expected,
            got: got.kind(),
        }
    }

    /// Prefix the error path with an enclosing field or index
    pub fn within(self, segment: &str) -> Self {
        match self {
            Self::Mismatch {
                path,
                expected,
                got,
            } => Self::Mismatch {
                path: if path.is_empty() {
                    segment.to_string()
                } else if path.starts_with('[') {
                    format!("{}{}", segment, path)
                } else {
                    format!("{}.{}", segment, path)
                },
                expected,
                got,
            },
        }
    }
}

/// A type that can be turned into a value tree and rebuilt from one
pub trait Reflect: Sized {
    fn reflect(&self) -> Value;

    fn reify(value: &Value) -> Result<Self, ReflectError>;
}

static NULL: Value = Value::Null;

/// Borrow the record behind a value, naming the expected type on failure
pub fn expect_record<'a>(value: &'a Value, type_name: &'static str) -> Result<&'a Record, ReflectError> {
    value
        .as_record()
        .ok_or_else(|| ReflectError::mismatch(type_name, value))
}

/// Reify a single field of a record; a missing field reads as null
pub fn reify_field<T: Reflect>(record: &Record, name: &str) -> Result<T, ReflectError> {
    T::reify(record.get(name).unwrap_or(&NULL)).map_err(|e| e.within(name))
}

/// Reflect a typed model into its record
///
/// Models produced by `record!` always reflect into a record.
pub fn to_record<T: Reflect>(model: &T) -> Record {
    match model.reflect() {
        Value::Record(record) => record,
        _ => Record::new(),
    }
}

macro_rules! reflect_scalar {
    ($ty:ty, $expected:literal, $variant:ident) => {
        impl Reflect for Attr<$ty> {
            fn reflect(&self) -> Value {
                match self {
                    Attr::Unknown => Value::Unknown,
                    Attr::Null => Value::Null,
                    Attr::Known(v) => Value::$variant(v.clone()),
                }
            }

            fn reify(value: &Value) -> Result<Self, ReflectError> {
                match value {
                    Value::Unknown => Ok(Attr::Unknown),
                    Value::Null => Ok(Attr::Null),
                    Value::$variant(v) => Ok(Attr::Known(v.clone())),
                    other => Err(ReflectError::mismatch($expected, other)),
                }
            }
        }
    };
}

reflect_scalar!(String, "string", String);
reflect_scalar!(i64, "int", Int);
reflect_scalar!(bool, "bool", Bool);

impl Reflect for Attr<f64> {
    fn reflect(&self) -> Value {
        match self {
            Attr::Unknown => Value::Unknown,
            Attr::Null => Value::Null,
            Attr::Known(v) => Value::Float(*v),
        }
    }

    fn reify(value: &Value) -> Result<Self, ReflectError> {
        match value {
            Value::Unknown => Ok(Attr::Unknown),
            Value::Null => Ok(Attr::Null),
            Value::Float(v) => Ok(Attr::Known(*v)),
            Value::Int(i) => Ok(Attr::Known(*i as f64)),
            other => Err(ReflectError::mismatch("float", other)),
        }
    }
}

/// Optional nested object; `None` is null
impl<T: Reflect> Reflect for Option<T> {
    fn reflect(&self) -> Value {
        match self {
            Some(inner) => inner.reflect(),
            None => Value::Null,
        }
    }

    fn reify(value: &Value) -> Result<Self, ReflectError> {
        if value.is_absent() {
            return Ok(None);
        }
        T::reify(value).map(Some)
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn reflect(&self) -> Value {
        (**self).reflect()
    }

    fn reify(value: &Value) -> Result<Self, ReflectError> {
        T::reify(value).map(Box::new)
    }
}

/// Lists and sets; a null list reads as empty
impl<T: Reflect> Reflect for Vec<T> {
    fn reflect(&self) -> Value {
        Value::List(self.iter().map(Reflect::reflect).collect())
    }

    fn reify(value: &Value) -> Result<Self, ReflectError> {
        match value {
            Value::Unknown | Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::reify(item).map_err(|e| e.within(&format!("[{}]", i))))
                .collect(),
            other => Err(ReflectError::mismatch("list", other)),
        }
    }
}

impl Reflect for Value {
    fn reflect(&self) -> Value {
        self.clone()
    }

    fn reify(value: &Value) -> Result<Self, ReflectError> {
        Ok(value.clone())
    }
}

/// Declare a model struct and derive its [`Reflect`] implementation
///
/// Field names become record keys.
///
/// ```ignore
/// tfmeraki_core::record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct ApplianceVlan {
///         pub network_id: Attr<String>,
///         pub name: Attr<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::reflect::Reflect for $name {
            fn reflect(&self) -> $crate::resource::Value {
                let mut record = $crate::resource::Record::new();
                $(
                    record.insert(
                        stringify!($field),
                        $crate::reflect::Reflect::reflect(&self.$field),
                    );
                )*
                $crate::resource::Value::Record(record)
            }

            fn reify(
                value: &$crate::resource::Value,
            ) -> ::std::result::Result<Self, $crate::reflect::ReflectError> {
                let record = $crate::reflect::expect_record(value, stringify!($name))?;
                ::std::result::Result::Ok(Self {
                    $(
                        $field: $crate::reflect::reify_field(record, stringify!($field))?,
                    )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Dhcp {
            lease_time: Attr<String>,
            boot_options: Attr<bool>,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Vlan {
            name: Attr<String>,
            vlan_id: Attr<i64>,
            weight: Attr<f64>,
            dhcp: Option<Box<Dhcp>>,
            reserved: Vec<Dhcp>,
        }
    }

    #[test]
    fn reflect_uses_field_names_in_order() {
        let vlan = Vlan {
            name: Attr::from("guest".to_string()),
            vlan_id: Attr::Known(20),
            ..Default::default()
        };

        let record = to_record(&vlan);
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["name", "vlan_id", "weight", "dhcp", "reserved"]);
        assert_eq!(record.get("vlan_id"), Some(&Value::Int(20)));
        assert_eq!(record.get("dhcp"), Some(&Value::Null));
        assert_eq!(record.get("reserved"), Some(&Value::List(vec![])));
    }

    #[test]
    fn reify_restores_nested_records() {
        let vlan = Vlan {
            name: Attr::Unknown,
            vlan_id: Attr::Known(30),
            weight: Attr::Known(1.5),
            dhcp: Some(Box::new(Dhcp {
                lease_time: Attr::from("1 day".to_string()),
                boot_options: Attr::Known(true),
            })),
            reserved: vec![Dhcp::default()],
        };

        let restored = Vlan::reify(&vlan.reflect()).unwrap();
        assert_eq!(restored, vlan);
    }

    #[test]
    fn missing_fields_read_as_null() {
        let value = Value::Record(Record::new().with_field("vlan_id", 5i64));
        let vlan = Vlan::reify(&value).unwrap();
        assert!(vlan.name.is_null());
        assert!(vlan.dhcp.is_none());
        assert!(vlan.reserved.is_empty());
    }

    #[test]
    fn float_accepts_integers() {
        let value = Value::Record(Record::new().with_field("weight", 2i64));
        let vlan = Vlan::reify(&value).unwrap();
        assert_eq!(vlan.weight, Attr::Known(2.0));
    }

    #[test]
    fn mismatch_reports_nested_path() {
        let value = Value::Record(Record::new().with_field(
            "reserved",
            Value::List(vec![Value::Record(
                Record::new().with_field("boot_options", "yes"),
            )]),
        ));

        let err = Vlan::reify(&value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "reserved[0].boot_options: expected bool, got string"
        );
    }
}
