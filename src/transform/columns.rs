use crate::model::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Float,
    String,
}

/// The outcome of sampling a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(ScalarType),
    /// No row holds a non-null value.
    Untyped,
    /// The first non-null value is not a supported scalar.
    Unsupported(&'static str),
}

/// Type of the first present, non-null value of `column`.
pub fn resolve_column_type<'a>(
    column: &str,
    rows: impl IntoIterator<Item = &'a Row>,
) -> ColumnType {
    let first = rows
        .into_iter()
        .filter_map(|row| row.get(column))
        .find(|v| !v.is_null());

    match first {
        None | Some(Value::Null) => ColumnType::Untyped,
        Some(Value::Bool(_)) => ColumnType::Scalar(ScalarType::Bool),
        Some(Value::Number(_)) => ColumnType::Scalar(ScalarType::Float),
        Some(Value::String(_)) => ColumnType::Scalar(ScalarType::String),
        Some(other @ Value::Other(_)) => ColumnType::Unsupported(other.type_name()),
    }
}
