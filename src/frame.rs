//! Output tables handed back to the visualization host.
//!
//! A [`Frame`] is a wide-format table: one `time` field and any number of
//! value fields, all of the same length.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Float(Vec<f64>),
    String(Vec<String>),
    Bool(Vec<bool>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Float(v) => v.len(),
            FieldValues::String(v) => v.len(),
            FieldValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValues::Time(_) => "time",
            FieldValues::Float(_) => "float",
            FieldValues::String(_) => "string",
            FieldValues::Bool(_) => "bool",
        }
    }

    /// Render the value at `index` for text output.
    pub fn display_at(&self, index: usize) -> Option<String> {
        match self {
            FieldValues::Time(v) => v
                .get(index)
                .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
            FieldValues::Float(v) => v.get(index).map(|f| f.to_string()),
            FieldValues::String(v) => v.get(index).cloned(),
            FieldValues::Bool(v) => v.get(index).map(|b| b.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, labels: Option<Labels>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            labels,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A non-fatal diagnostic attached to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStat {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    pub executed_query_string: String,
    pub stats: Vec<QueryStat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    pub meta: FrameMeta,
}

impl Frame {
    pub fn new(name: impl Into<String>, meta: FrameMeta) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta,
        }
    }

    /// Number of rows, taken from the first field.
    pub fn rows(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    /// Append a field, refusing one whose length differs from the fields
    /// already in the frame.
    pub fn push_field(&mut self, field: Field) -> Result<(), FrameError> {
        if let Some(first) = self.fields.first() {
            let actual = field.len();
            if first.len() != actual {
                return Err(FrameError::LengthMismatch {
                    frame: self.name.clone(),
                    field: field.name,
                    expected: first.len(),
                    actual,
                });
            }
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
