//! # Record schemas
//!
//! A schema declares, per table, the ordered field list with a type and a
//! required/optional tag, plus the column that holds the record's media.
//! Required fields are checked in declaration order, so the first missing
//! field reported is always the same one for the same record.
//!
//! Optional fields are the ones a persister may drop when the backing table
//! does not have the column yet.

use chrono::NaiveDate;

use crate::errors::{FlockError, FlockResult};
use crate::record::{PersistableRecord, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    /// ISO `YYYY-MM-DD`
    Date,
}

impl FieldKind {
    fn accepts(&self, value: &Scalar) -> bool {
        match (self, value) {
            (_, Scalar::Null) => true,
            (FieldKind::Text, Scalar::Text(_)) => true,
            (FieldKind::Integer, Scalar::Integer(_)) => true,
            (FieldKind::Integer, Scalar::Text(s)) => s.trim().is_empty() || s.trim().parse::<i64>().is_ok(),
            (FieldKind::Float, Scalar::Float(_) | Scalar::Integer(_)) => true,
            (FieldKind::Float, Scalar::Text(s)) => s.trim().is_empty() || s.trim().parse::<f64>().is_ok(),
            (FieldKind::Bool, Scalar::Bool(_)) => true,
            (FieldKind::Date, Scalar::Text(s)) => {
                s.trim().is_empty() || NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok()
            }
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    table: String,
    fields: Vec<FieldSpec>,
    media_field: Option<String>,
}

impl RecordSchema {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            media_field: None,
        }
    }

    pub fn required<S: Into<String>>(self, name: S, kind: FieldKind) -> Self {
        self.field(name, kind, true)
    }

    pub fn optional<S: Into<String>>(self, name: S, kind: FieldKind) -> Self {
        self.field(name, kind, false)
    }

    fn field<S: Into<String>>(mut self, name: S, kind: FieldKind, required: bool) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldSpec { name, kind, required });
        self
    }

    /// Column the record's media reference is stored in.
    pub fn media<S: Into<String>>(mut self, column: S) -> Self {
        self.media_field = Some(column.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn media_field(&self) -> Option<&str> {
        self.media_field.as_deref()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Required field names in declaration order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.spec(name).map(|f| f.required).unwrap_or(false)
    }

    /// Required fields first, then declared types.
    pub fn validate(&self, record: &PersistableRecord) -> FlockResult<()> {
        check_required(record, &self.required_fields())?;
        self.check_kinds(record)
    }

    /// Every declared field present in the record holds a value of its kind.
    pub fn check_kinds(&self, record: &PersistableRecord) -> FlockResult<()> {
        for (name, value) in record.fields() {
            if let Some(spec) = self.spec(name) {
                if !spec.kind.accepts(value) {
                    return Err(FlockError::validation(format!(
                        "'{name}' must be a {}",
                        spec.kind.name()
                    ))
                    .with_field(name));
                }
            }
        }
        Ok(())
    }
}

/// First field of `required` (in the given order) that is missing or blank.
pub fn check_required(record: &PersistableRecord, required: &[&str]) -> FlockResult<()> {
    match required.iter().find(|name| !record.is_present(name)) {
        Some(name) => Err(FlockError::missing_field(name)),
        None => Ok(()),
    }
}
