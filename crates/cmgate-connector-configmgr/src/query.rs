//! Structured queries.
//!
//! Callers never format query text by hand. A [`WqlQuery`] renders to WQL for
//! WMI-backed providers and to an OData `$filter` for the AdminService, and
//! quotes every literal on the way out.

use serde_json::Value;
use std::fmt::{Display, Formatter};

use crate::object::PlaneObject;

/// A literal compared against a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
}

impl QueryValue {
    fn wql_literal(&self) -> String {
        match self {
            Self::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Int(i) => i.to_string(),
        }
    }

    pub(crate) fn odata_literal(&self) -> String {
        match self {
            Self::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Int(i) => i.to_string(),
        }
    }

    /// WQL comparison semantics: strings compare case-insensitively, and a
    /// numeric string equals the number it spells.
    fn matches(&self, actual: &Value) -> bool {
        match (self, actual) {
            (Self::Str(expected), Value::String(s)) => s.eq_ignore_ascii_case(expected),
            (Self::Str(expected), Value::Number(n)) => n.to_string() == *expected,
            (Self::Int(expected), Value::Number(n)) => n.as_i64() == Some(*expected),
            (Self::Int(expected), Value::String(s)) => s.trim().parse::<i64>().ok() == Some(*expected),
            (Self::Int(expected), Value::Bool(b)) => i64::from(*b) == *expected,
            (_, Value::Array(items)) => items.iter().any(|item| self.matches(item)),
            _ => false,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for QueryValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<cmgate_core::ResourceId> for QueryValue {
    fn from(id: cmgate_core::ResourceId) -> Self {
        Self::Int(id.get())
    }
}

/// A WHERE-clause predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals { property: String, value: QueryValue },
    IsNull { property: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(property: &str, value: impl Into<QueryValue>) -> Self {
        Self::Equals {
            property: property.to_string(),
            value: value.into(),
        }
    }

    pub fn is_null(property: &str) -> Self {
        Self::IsNull {
            property: property.to_string(),
        }
    }

    /// Combine with another filter using AND, flattening nested ANDs.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// `property = 0 OR property IS NULL`, the usual "not flagged" test on
    /// ConfigMgr discovery data.
    pub fn zero_or_null(property: &str) -> Self {
        Self::Or(vec![Self::eq(property, 0i64), Self::is_null(property)])
    }

    pub fn matches(&self, row: &PlaneObject) -> bool {
        match self {
            Self::Equals { property, value } => {
                row.get(property).is_some_and(|actual| value.matches(actual))
            }
            Self::IsNull { property } => row.get(property).map_or(true, Value::is_null),
            Self::And(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }

    fn render(&self, dialect: Dialect, nested: bool) -> String {
        match self {
            Self::Equals { property, value } => match dialect {
                Dialect::Wql => format!("{property} = {}", value.wql_literal()),
                Dialect::OData => format!("{property} eq {}", value.odata_literal()),
            },
            Self::IsNull { property } => match dialect {
                Dialect::Wql => format!("{property} IS NULL"),
                Dialect::OData => format!("{property} eq null"),
            },
            Self::And(filters) => join(filters, dialect, dialect.and(), nested),
            Self::Or(filters) => join(filters, dialect, dialect.or(), nested),
        }
    }
}

fn join(filters: &[Filter], dialect: Dialect, op: &str, nested: bool) -> String {
    let parts: Vec<String> = filters.iter().map(|f| f.render(dialect, true)).collect();
    let joined = parts.join(op);
    if nested && filters.len() > 1 {
        format!("({joined})")
    } else {
        joined
    }
}

#[derive(Clone, Copy)]
enum Dialect {
    Wql,
    OData,
}

impl Dialect {
    fn and(self) -> &'static str {
        match self {
            Self::Wql => " AND ",
            Self::OData => " and ",
        }
    }

    fn or(self) -> &'static str {
        match self {
            Self::Wql => " OR ",
            Self::OData => " or ",
        }
    }
}

/// `SELECT <properties> FROM <class> [WHERE <filter>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WqlQuery {
    pub class: String,
    pub properties: Vec<String>,
    pub filter: Option<Filter>,
}

impl WqlQuery {
    /// Select every property of `class`.
    pub fn select(class: &str) -> Self {
        Self {
            class: class.to_string(),
            properties: Vec::new(),
            filter: None,
        }
    }

    #[must_use]
    pub fn properties(mut self, properties: &[&str]) -> Self {
        self.properties = properties.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Adds a predicate, ANDed with any existing one.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// The `$filter` expression for AdminService queries, if any.
    #[must_use]
    pub fn odata_filter(&self) -> Option<String> {
        self.filter
            .as_ref()
            .map(|f| f.render(Dialect::OData, false))
    }

    /// The `$select` list for AdminService queries, if any.
    #[must_use]
    pub fn odata_select(&self) -> Option<String> {
        (!self.properties.is_empty()).then(|| self.properties.join(","))
    }

    pub fn matches(&self, row: &PlaneObject) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(row))
    }
}

impl Display for WqlQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let properties = if self.properties.is_empty() {
            "*".to_string()
        } else {
            self.properties.join(", ")
        };
        write!(f, "SELECT {properties} FROM {}", self.class)?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter.render(Dialect::Wql, false))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_query(name: &str) -> WqlQuery {
        WqlQuery::select("SMS_R_System")
            .properties(&["ResourceID", "Name", "SMSUniqueIdentifier"])
            .filter(Filter::eq("Name", name))
            .filter(Filter::zero_or_null("Obsolete"))
    }

    #[test]
    fn test_render_wql() {
        assert_eq!(
            device_query("PC01").to_string(),
            "SELECT ResourceID, Name, SMSUniqueIdentifier FROM SMS_R_System \
             WHERE Name = 'PC01' AND (Obsolete = 0 OR Obsolete IS NULL)"
        );
        assert_eq!(
            WqlQuery::select("SMS_Site").to_string(),
            "SELECT * FROM SMS_Site"
        );
    }

    #[test]
    fn test_render_odata() {
        let query = device_query("PC01");
        assert_eq!(
            query.odata_filter().unwrap(),
            "Name eq 'PC01' and (Obsolete eq 0 or Obsolete eq null)"
        );
        assert_eq!(
            query.odata_select().unwrap(),
            "ResourceID,Name,SMSUniqueIdentifier"
        );
    }

    #[test]
    fn test_literals_are_escaped() {
        let query = WqlQuery::select("SMS_R_User").filter(Filter::eq("UniqueUserName", "corp\\o'brien"));
        assert_eq!(
            query.to_string(),
            "SELECT * FROM SMS_R_User WHERE UniqueUserName = 'corp\\\\o\\'brien'"
        );
        assert_eq!(
            query.odata_filter().unwrap(),
            "UniqueUserName eq 'corp\\o''brien'"
        );
    }

    #[test]
    fn test_matching() {
        let live: PlaneObject = serde_json::from_value(json!({
            "Name": "pc01", "ResourceID": 7, "Obsolete": null
        }))
        .unwrap();
        let obsolete: PlaneObject = serde_json::from_value(json!({
            "Name": "PC01", "ResourceID": 8, "Obsolete": 1
        }))
        .unwrap();
        let query = device_query("PC01");
        assert!(query.matches(&live));
        assert!(!query.matches(&obsolete));

        let by_id = WqlQuery::select("SMS_R_System").filter(Filter::eq("ResourceID", 7i64));
        assert!(by_id.matches(&live));
    }

    #[test]
    fn test_array_properties_match_any_element() {
        let row: PlaneObject =
            serde_json::from_value(json!({"Sources": [4, 2]})).unwrap();
        assert!(Filter::eq("Sources", 2i64).matches(&row));
        assert!(!Filter::eq("Sources", 3i64).matches(&row));
    }
}
