use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single field value as seen by the engine, whatever store produced it.
///
/// Exact-decimal columns are normalized to `Float` by the adapters. Lists,
/// maps, nodes and other nested results are kept as `Json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn display(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Json(j) => j.to_string(),
        }
    }

    /// Convert a JSON value coming back from a store. Scalars map onto the
    /// matching variant; arrays and objects stay nested.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Json(j) => j.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

/// One result record: field names in the order the store returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Set a field, replacing an existing value in place so field order is kept.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> Self {
        object
            .into_iter()
            .map(|(name, value)| (name, Value::from_json(value)))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (field, value) in iter {
            row.insert(field, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Build a [`Row`] from `field => value` pairs.
#[macro_export]
macro_rules! row {
    ($($field:expr => $value:expr),* $(,)?) => {{
        let mut row = $crate::db::Row::new();
        $(row.insert($field, $crate::db::Value::from($value));)*
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.display(), "NULL");
        assert_eq!(Value::Bool(true).display(), "true");
        assert_eq!(Value::Int(-100).display(), "-100");
        assert_eq!(Value::Float(2.718).display(), "2.718");
        assert_eq!(Value::Text("hello".into()).display(), "hello");
    }

    #[test]
    fn test_from_json_keeps_integers_integral() {
        assert_eq!(Value::from_json(serde_json::json!(7)), Value::Int(7));
        assert_eq!(Value::from_json(serde_json::json!(7.5)), Value::Float(7.5));
        assert!(matches!(
            Value::from_json(serde_json::json!([1, 2])),
            Value::Json(_)
        ));
    }

    #[test]
    fn test_row_insert_overrides_in_place() {
        let mut row = crate::row! { "id" => 1i64, "x" => "a" };
        row.insert("id", Value::Int(2));
        row.insert("y", Value::from("b"));
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["id", "x", "y"]);
        assert_eq!(row.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_row_serializes_as_ordered_object() {
        let row = crate::row! { "z" => 1i64, "a" => "b" };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"z":1,"a":"b"}"#);
    }
}
