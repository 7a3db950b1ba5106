//! Matcher - Find a record by one of its fields inside a list response
//!
//! Resources are addressed by an opaque id that only exists after creation, while
//! configurations address them by name. Listing the collection and matching on
//! the name recovers that id and makes upsert-by-name possible.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::resource::{Record, Value};

/// Fields a record can be matched or identified by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchField {
    Name,
    Id,
    Serial,
    Mac,
    Email,
    NetworkId,
    VlanId,
    InterfaceId,
    AclId,
    CertificateId,
}

impl MatchField {
    pub const ALL: [MatchField; 10] = [
        MatchField::Name,
        MatchField::Id,
        MatchField::Serial,
        MatchField::Mac,
        MatchField::Email,
        MatchField::NetworkId,
        MatchField::VlanId,
        MatchField::InterfaceId,
        MatchField::AclId,
        MatchField::CertificateId,
    ];

    /// Record key of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Name => "name",
            MatchField::Id => "id",
            MatchField::Serial => "serial",
            MatchField::Mac => "mac",
            MatchField::Email => "email",
            MatchField::NetworkId => "network_id",
            MatchField::VlanId => "vlan_id",
            MatchField::InterfaceId => "interface_id",
            MatchField::AclId => "acl_id",
            MatchField::CertificateId => "certificate_id",
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = MatchField::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown match field '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

/// Comparison between a record's field value and the target value
pub trait Comparator {
    fn matches(&self, candidate: &str, target: &str) -> bool;
}

/// Built-in comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    Exact,
    CaseInsensitive,
    Trimmed,
}

impl Comparator for Comparison {
    fn matches(&self, candidate: &str, target: &str) -> bool {
        match self {
            Comparison::Exact => candidate == target,
            Comparison::CaseInsensitive => candidate.to_lowercase() == target.to_lowercase(),
            Comparison::Trimmed => candidate.trim() == target.trim(),
        }
    }
}

impl<F> Comparator for F
where
    F: Fn(&str, &str) -> bool,
{
    fn matches(&self, candidate: &str, target: &str) -> bool {
        self(candidate, target)
    }
}

/// What to do when several records match the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Return the first match in list order
    #[default]
    FirstMatch,
    /// Fail when more than one record matches
    Reject,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("field '{field}' is not part of the record shape")]
    FieldMissing { field: MatchField },

    #[error("field '{field}' is {got}, expected a string")]
    FieldNotString { field: MatchField, got: &'static str },

    #[error("field '{field}' is empty")]
    EmptyIdentifier { field: MatchField },

    #[error("list element {index} is {got}, expected a record")]
    NotARecord { index: usize, got: &'static str },

    #[error("{got} response has no list to search")]
    NoList { got: &'static str },

    #[error("{count} records have {field} matching '{target}'")]
    Ambiguous {
        field: MatchField,
        target: String,
        count: usize,
    },
}

/// Locates a record by field value in a list, or in a record wrapping a list
#[derive(Debug, Clone)]
pub struct RecordMatcher<C = Comparison> {
    field: MatchField,
    comparator: C,
    duplicates: DuplicatePolicy,
}

impl RecordMatcher<Comparison> {
    pub fn new(field: MatchField) -> Self {
        Self {
            field,
            comparator: Comparison::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl<C: Comparator> RecordMatcher<C> {
    pub fn with_comparator<D: Comparator>(self, comparator: D) -> RecordMatcher<D> {
        RecordMatcher {
            field: self.field,
            comparator,
            duplicates: self.duplicates,
        }
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn field(&self) -> MatchField {
        self.field
    }

    /// Find the record whose field matches `target`
    ///
    /// A record input is searched through its first list-shaped field, one level
    /// deep. A null response reads as an empty list.
    pub fn find<'a>(&self, haystack: &'a Value, target: &str) -> Result<Option<&'a Record>, MatchError> {
        match haystack {
            Value::List(items) => self.find_in(items, target),
            Value::Record(record) => match record.first_list() {
                Some((name, items)) => {
                    debug!("searching wrapped list '{}'", name);
                    self.find_in(items, target)
                }
                None => Err(MatchError::NoList { got: "record" }),
            },
            Value::Unknown | Value::Null => Ok(None),
            other => Err(MatchError::NoList { got: other.kind() }),
        }
    }

    /// Find the record whose field matches `target` in a record list
    pub fn find_in<'a>(&self, items: &'a [Value], target: &str) -> Result<Option<&'a Record>, MatchError> {
        let mut found: Option<&'a Record> = None;
        let mut count = 0;

        for (index, item) in items.iter().enumerate() {
            let record = item.as_record().ok_or(MatchError::NotARecord {
                index,
                got: item.kind(),
            })?;

            if !self.is_match(record, target)? {
                continue;
            }

            count += 1;
            match self.duplicates {
                DuplicatePolicy::FirstMatch => {
                    debug!("{} '{}' matched list element {}", self.field, target, index);
                    return Ok(Some(record));
                }
                DuplicatePolicy::Reject => {
                    found.get_or_insert(record);
                }
            }
        }

        if count > 1 {
            return Err(MatchError::Ambiguous {
                field: self.field,
                target: target.to_string(),
                count,
            });
        }
        if found.is_none() {
            debug!("{} '{}' not found among {} records", self.field, target, items.len());
        }
        Ok(found)
    }

    fn is_match(&self, record: &Record, target: &str) -> Result<bool, MatchError> {
        match record.get(self.field.as_str()) {
            None => Err(MatchError::FieldMissing { field: self.field }),
            Some(Value::String(candidate)) => Ok(self.comparator.matches(candidate, target)),
            // Not yet named remotely, so it cannot be the one we want
            Some(Value::Unknown | Value::Null) => Ok(false),
            Some(other) => Err(MatchError::FieldNotString {
                field: self.field,
                got: other.kind(),
            }),
        }
    }
}

/// Find a record by exact match, first match wins
pub fn find_record<'a>(
    haystack: &'a Value,
    field: MatchField,
    target: &str,
) -> Result<Option<&'a Record>, MatchError> {
    RecordMatcher::new(field).find(haystack, target)
}

/// Read an identifier out of a matched record
///
/// Missing, non-string and empty identifiers are errors; a write must never be
/// issued against a defaulted id.
pub fn require_string(record: &Record, field: MatchField) -> Result<&str, MatchError> {
    match record.get(field.as_str()) {
        None => Err(MatchError::FieldMissing { field }),
        Some(Value::String(s)) if s.is_empty() => Err(MatchError::EmptyIdentifier { field }),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(Value::Unknown | Value::Null) => Err(MatchError::EmptyIdentifier { field }),
        Some(other) => Err(MatchError::FieldNotString {
            field,
            got: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acl(id: &str, name: &str) -> Value {
        Value::Record(
            Record::new()
                .with_field("acl_id", id)
                .with_field("name", name)
                .with_field("ip_version", "any"),
        )
    }

    fn acls() -> Value {
        Value::List(vec![
            acl("1", "Block IoT"),
            acl("2", "Allow Printers"),
            acl("3", "Guest Isolation"),
        ])
    }

    #[test]
    fn finds_the_single_matching_record() {
        let list = acls();
        let found = find_record(&list, MatchField::Name, "Allow Printers")
            .unwrap()
            .unwrap();
        assert_eq!(require_string(found, MatchField::AclId), Ok("2"));
    }

    #[test]
    fn absent_target_is_not_found() {
        let list = acls();
        assert_eq!(find_record(&list, MatchField::Name, "Nope"), Ok(None));
    }

    #[test]
    fn duplicates_return_first_in_list_order() {
        let list = Value::List(vec![acl("7", "dup"), acl("8", "dup")]);
        let found = find_record(&list, MatchField::Name, "dup").unwrap().unwrap();
        assert_eq!(require_string(found, MatchField::AclId), Ok("7"));
    }

    #[test]
    fn duplicates_can_be_rejected() {
        let list = Value::List(vec![acl("7", "dup"), acl("8", "dup"), acl("9", "other")]);
        let matcher = RecordMatcher::new(MatchField::Name).with_duplicates(DuplicatePolicy::Reject);

        assert_eq!(
            matcher.find(&list, "dup"),
            Err(MatchError::Ambiguous {
                field: MatchField::Name,
                target: "dup".to_string(),
                count: 2,
            })
        );
        let other = matcher.find(&list, "other").unwrap().unwrap();
        assert_eq!(require_string(other, MatchField::AclId), Ok("9"));
    }

    #[test]
    fn wrapped_list_is_searched_one_level_down() {
        let wrapped = Value::Record(
            Record::new()
                .with_field("total", 3i64)
                .with_field("assigned", acls())
                .with_field("unassigned", Value::List(vec![acl("9", "Block IoT")])),
        );

        let found = find_record(&wrapped, MatchField::Name, "Block IoT")
            .unwrap()
            .unwrap();
        assert_eq!(require_string(found, MatchField::AclId), Ok("1"));
    }

    #[test]
    fn record_without_list_is_an_error() {
        let record = Value::Record(Record::new().with_field("name", "x"));
        assert_eq!(
            find_record(&record, MatchField::Name, "x"),
            Err(MatchError::NoList { got: "record" })
        );
    }

    #[test]
    fn null_response_is_not_found() {
        assert_eq!(find_record(&Value::Null, MatchField::Name, "x"), Ok(None));
    }

    #[test]
    fn alternate_comparisons() {
        let list = acls();

        let insensitive = RecordMatcher::new(MatchField::Name).with_comparator(Comparison::CaseInsensitive);
        assert!(insensitive.find(&list, "guest isolation").unwrap().is_some());

        let trimmed = RecordMatcher::new(MatchField::Name).with_comparator(Comparison::Trimmed);
        assert!(trimmed.find(&list, "  Block IoT ").unwrap().is_some());

        let prefix = RecordMatcher::new(MatchField::Name)
            .with_comparator(|candidate: &str, target: &str| candidate.starts_with(target));
        let found = prefix.find(&list, "Allow").unwrap().unwrap();
        assert_eq!(require_string(found, MatchField::AclId), Ok("2"));
    }

    #[test]
    fn missing_match_field_is_an_error() {
        let list = acls();
        assert_eq!(
            find_record(&list, MatchField::Serial, "Q2XX"),
            Err(MatchError::FieldMissing {
                field: MatchField::Serial
            })
        );
    }

    #[test]
    fn non_string_match_field_is_an_error() {
        let list = Value::List(vec![Value::Record(Record::new().with_field("name", 42i64))]);
        assert_eq!(
            find_record(&list, MatchField::Name, "42"),
            Err(MatchError::FieldNotString {
                field: MatchField::Name,
                got: "int"
            })
        );
    }

    #[test]
    fn unnamed_records_are_skipped() {
        let list = Value::List(vec![
            Value::Record(Record::new().with_field("name", Value::Null)),
            acl("4", "named"),
        ]);
        assert!(find_record(&list, MatchField::Name, "named").unwrap().is_some());
    }

    #[test]
    fn non_record_elements_are_rejected() {
        let list = Value::List(vec![Value::from("loose")]);
        assert_eq!(
            find_record(&list, MatchField::Name, "loose"),
            Err(MatchError::NotARecord {
                index: 0,
                got: "string"
            })
        );
    }

    #[test]
    fn identifier_must_be_a_non_empty_string() {
        let record = Record::new()
            .with_field("id", "")
            .with_field("acl_id", 5i64)
            .with_field("serial", Value::Null);

        assert_eq!(
            require_string(&record, MatchField::Id),
            Err(MatchError::EmptyIdentifier { field: MatchField::Id })
        );
        assert_eq!(
            require_string(&record, MatchField::AclId),
            Err(MatchError::FieldNotString {
                field: MatchField::AclId,
                got: "int"
            })
        );
        assert_eq!(
            require_string(&record, MatchField::Serial),
            Err(MatchError::EmptyIdentifier {
                field: MatchField::Serial
            })
        );
        assert_eq!(
            require_string(&record, MatchField::Mac),
            Err(MatchError::FieldMissing { field: MatchField::Mac })
        );
    }

    #[test]
    fn match_field_parses_from_record_key() {
        assert_eq!("network_id".parse::<MatchField>(), Ok(MatchField::NetworkId));
        assert!("Name".parse::<MatchField>().is_err());
    }
}
