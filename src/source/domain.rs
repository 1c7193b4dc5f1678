//! Read-only view of relational records and relation-path traversal

use crate::search::FieldValue;
use serde_json::Value;

/// What a record yields for one attribute name
pub enum Attr<'a> {
    /// Column value
    Scalar(FieldValue),
    /// Forward relation (foreign key / one-to-one)
    Object(&'a dyn DomainObject),
    /// Reverse or many-to-many relation
    Many(Vec<&'a dyn DomainObject>),
}

/// A record of the relational store as seen by document builders.
///
/// Missing and null attributes both return `None`.
pub trait DomainObject: Send + Sync {
    fn get_attr(&self, name: &str) -> Option<Attr<'_>>;

    fn primary_key(&self) -> Option<i64> {
        match self.get_attr("id")? {
            Attr::Scalar(FieldValue::Int(pk)) => Some(pk),
            _ => None,
        }
    }

    /// Raw JSON form, for attributes stored as opaque structures
    fn to_json(&self) -> Option<Value> {
        None
    }
}

impl DomainObject for Value {
    fn get_attr(&self, name: &str) -> Option<Attr<'_>> {
        match self.get(name)? {
            Value::Null => None,
            Value::Bool(b) => Some(Attr::Scalar(FieldValue::Bool(*b))),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float))
                .map(Attr::Scalar),
            Value::String(s) => Some(Attr::Scalar(FieldValue::Str(s.clone()))),
            Value::Array(items) => Some(Attr::Many(
                items.iter().map(|item| item as &dyn DomainObject).collect(),
            )),
            object @ Value::Object(_) => Some(Attr::Object(object)),
        }
    }

    fn to_json(&self) -> Option<Value> {
        Some(self.clone())
    }
}

/// Follow a `a__b__c` path one hop at a time; any missing hop ends the walk
pub fn resolve_path<'a>(obj: &'a dyn DomainObject, path: &str) -> Option<Attr<'a>> {
    let mut hops = path.split("__");
    let mut current = obj.get_attr(hops.next()?)?;
    for hop in hops {
        current = match current {
            Attr::Object(related) => related.get_attr(hop)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Scalar at the end of a path
pub fn path_value(obj: &dyn DomainObject, path: &str) -> Option<FieldValue> {
    match resolve_path(obj, path)? {
        Attr::Scalar(value) => Some(value),
        _ => None,
    }
}

/// Scalar at the end of a path, rendered as text
pub fn path_str(obj: &dyn DomainObject, path: &str) -> Option<String> {
    path_value(obj, path).map(|value| value.to_string())
}

/// Integer at the end of a path
pub fn path_int(obj: &dyn DomainObject, path: &str) -> Option<i64> {
    match path_value(obj, path)? {
        FieldValue::Int(n) => Some(n),
        FieldValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Related record at the end of a path
pub fn related<'a>(obj: &'a dyn DomainObject, path: &str) -> Option<&'a dyn DomainObject> {
    match resolve_path(obj, path)? {
        Attr::Object(related) => Some(related),
        _ => None,
    }
}

/// Related collection at the end of a path; absent relations are empty
pub fn related_many<'a>(obj: &'a dyn DomainObject, path: &str) -> Vec<&'a dyn DomainObject> {
    match resolve_path(obj, path) {
        Some(Attr::Many(items)) => items,
        _ => Vec::new(),
    }
}
