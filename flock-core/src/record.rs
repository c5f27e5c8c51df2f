use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::MediaReference;

/// A row as exchanged with a record store: an insertion-ordered JSON object.
pub type Row = serde_json::Map<String, Value>;

/// A single field value of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Present means non-null, and non-blank for text.
    pub fn is_present(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(n) => Value::from(*n),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::Integer(i),
                None => Scalar::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// An ordered set of named scalar fields plus an optional media reference.
///
/// Built once by the caller and handed by value to a persister. Deriving a
/// variant (`without_field`) clones into a fresh record; nothing mutates a
/// record after it has been built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistableRecord {
    fields: Vec<(String, Scalar)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media: Option<MediaReference>,
}

impl PersistableRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Re-setting an existing name keeps its original position.
    pub fn with_field<K: Into<String>, V: Into<Scalar>>(mut self, name: K, value: V) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn with_media(mut self, media: MediaReference) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_optional_media(mut self, media: Option<MediaReference>) -> Self {
        self.media = media;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The field exists and is non-empty after trimming.
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).map(Scalar::is_present).unwrap_or(false)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Scalar::as_text)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.media.is_none()
    }

    pub fn media(&self) -> Option<&MediaReference> {
        self.media.as_ref()
    }

    /// A fresh record with `name` removed.
    pub fn without_field(&self, name: &str) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|(n, _)| n != name)
                .cloned()
                .collect(),
            media: self.media.clone(),
        }
    }

    /// Render as a store row. Media goes into `media_field` as a URI; a record
    /// with media but no media column keeps only its scalar fields.
    pub fn to_row(&self, media_field: Option<&str>) -> Row {
        let mut row = Row::new();
        for (name, value) in &self.fields {
            row.insert(name.clone(), value.to_json());
        }
        if let (Some(column), Some(media)) = (media_field, &self.media) {
            row.insert(column.to_string(), Value::String(media.to_uri()));
        }
        row
    }

    /// Read a store row back. A parseable value in `media_field` becomes the
    /// record's media; anything else in that column stays a plain field.
    pub fn from_row(row: &Row, media_field: Option<&str>) -> Self {
        let mut record = Self::new();
        for (name, value) in row {
            if Some(name.as_str()) == media_field {
                match value {
                    Value::String(s) if !s.trim().is_empty() => {
                        match MediaReference::parse(s) {
                            Ok(media) => record.media = Some(media),
                            Err(_) => record.fields.push((name.clone(), Scalar::Text(s.clone()))),
                        }
                    }
                    _ => {}
                }
                continue;
            }
            record.fields.push((name.clone(), Scalar::from_json(value)));
        }
        record
    }
}
