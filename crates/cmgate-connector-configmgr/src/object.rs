//! Property-bag rows and instance paths.
//!
//! A [`PlaneObject`] is what a provider hands back for a query row or a method's
//! out-parameters, and what it receives as method in-parameters. Property lookup
//! is case-insensitive, as it is in WMI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use crate::error::{ProviderError, ProviderResult};
use crate::query::QueryValue;

/// A single WMI object: class properties, or method parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaneObject(Map<String, Value>);

impl PlaneObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: &str, value: impl Into<Value>) {
        let key = self.key_of(property).unwrap_or(property).to_string();
        self.0.insert(key, value.into());
    }

    /// Returns the property, matching the name case-insensitively.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0
            .get(property)
            .or_else(|| self.key_of(property).and_then(|k| self.0.get(k)))
    }

    /// A non-null string property.
    pub fn string(&self, property: &str) -> ProviderResult<String> {
        self.opt_string(property)
            .ok_or_else(|| missing(property, "a string"))
    }

    #[must_use]
    pub fn opt_string(&self, property: &str) -> Option<String> {
        match self.get(property)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// An integer property. WMI serializes 64-bit integers as strings, so numeric
    /// strings are accepted too.
    pub fn integer(&self, property: &str) -> ProviderResult<i64> {
        self.opt_integer(property)
            .ok_or_else(|| missing(property, "an integer"))
    }

    #[must_use]
    pub fn opt_integer(&self, property: &str) -> Option<i64> {
        match self.get(property)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<Value> {
        let key = self.key_of(property)?.to_string();
        self.0.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    fn key_of(&self, property: &str) -> Option<&str> {
        self.0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(property))
            .map(String::as_str)
    }
}

fn missing(property: &str, expected: &'static str) -> ProviderError {
    ProviderError::Property {
        property: property.to_string(),
        expected,
    }
}

impl From<Map<String, Value>> for PlaneObject {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Embedded objects, such as a collection rule passed as a method parameter.
impl From<PlaneObject> for Value {
    fn from(object: PlaneObject) -> Self {
        Value::Object(object.0)
    }
}

/// Path to one instance of a class, identified by its key property.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePath {
    pub class: String,
    pub key: String,
    pub value: QueryValue,
}

impl InstancePath {
    pub fn new(class: &str, key: &str, value: impl Into<QueryValue>) -> Self {
        Self {
            class: class.to_string(),
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// AdminService OData key segment, e.g. `SMS_Collection('PS100012')`.
    #[must_use]
    pub fn odata_segment(&self) -> String {
        format!("{}({})", self.class, self.value.odata_literal())
    }
}

/// WMI relative path, e.g. `SMS_Collection.CollectionID="PS100012"`.
impl Display for InstancePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            QueryValue::Str(s) => write!(
                f,
                "{}.{}=\"{}\"",
                self.class,
                self.key,
                s.replace('\\', "\\\\").replace('"', "\\\"")
            ),
            QueryValue::Int(i) => write!(f, "{}.{}={}", self.class, self.key, i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_insensitive_access() {
        let row = PlaneObject::new()
            .with("ResourceID", 16777220)
            .with("Name", "PC01");
        assert_eq!(row.integer("resourceid").unwrap(), 16777220);
        assert_eq!(row.string("NAME").unwrap(), "PC01");
    }

    #[test]
    fn test_set_preserves_existing_key_case() {
        let mut row = PlaneObject::new().with("CollectionID", "PS100001");
        row.set("collectionid", "PS100002");
        assert_eq!(row.iter().count(), 1);
        assert_eq!(row.get("CollectionID"), Some(&json!("PS100002")));
    }

    #[test]
    fn test_integer_from_string() {
        let row: PlaneObject = serde_json::from_value(json!({"ResourceID": "42"})).unwrap();
        assert_eq!(row.integer("ResourceID").unwrap(), 42);
    }

    #[test]
    fn test_missing_property() {
        let row = PlaneObject::new();
        assert!(matches!(
            row.string("Name"),
            Err(ProviderError::Property { .. })
        ));
        assert_eq!(row.opt_integer("Obsolete"), None);
    }

    #[test]
    fn test_instance_paths() {
        let path = InstancePath::new("SMS_Collection", "CollectionID", "PS100012");
        assert_eq!(path.to_string(), "SMS_Collection.CollectionID=\"PS100012\"");
        assert_eq!(path.odata_segment(), "SMS_Collection('PS100012')");

        let path = InstancePath::new("SMS_R_System", "ResourceID", 16777220i64);
        assert_eq!(path.to_string(), "SMS_R_System.ResourceID=16777220");
        assert_eq!(path.odata_segment(), "SMS_R_System(16777220)");
    }
}
