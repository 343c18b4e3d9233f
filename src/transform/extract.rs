use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::Partition;
use crate::error::ExtractError;
use crate::frame::{Field, FieldValues};
use crate::model::{Row, Value};

/// A time/value field pair extracted for one column of one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub time: Field,
    pub value: Field,
    /// Values left out because the column also held a type with higher
    /// precedence (float, then string, then bool).
    pub dropped: usize,
}

struct Series<T> {
    times: Vec<DateTime<Utc>>,
    values: Vec<T>,
}

impl<T> Series<T> {
    fn new() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, time: DateTime<Utc>, value: T) {
        self.times.push(time);
        self.values.push(value);
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

enum Sample<'a> {
    Float(f64),
    String(&'a str),
    Bool(bool),
}

/// Extract `value_column` of the rows in `partition`, aligned to `time_column`.
///
/// Rows without the value, or with a null or unsupported value, are skipped.
/// A missing or malformed timestamp on a row that carries a value fails the
/// whole extraction.
pub fn extract_column(
    time_column: &str,
    value_column: &str,
    partition: &Partition<'_>,
    rows: &[Row],
) -> Result<Extracted, ExtractError> {
    let mut floats = Series::new();
    let mut strings = Series::new();
    let mut bools = Series::new();

    for (i, row) in rows.iter().enumerate() {
        if !partition.contains(row) {
            continue;
        }

        let Some(value) = row.get(value_column) else {
            debug!(column = value_column, row = i, "value missing, skipping row");
            continue;
        };

        let sample = match value {
            Value::Number(f) => Sample::Float(*f),
            Value::String(s) => Sample::String(s),
            Value::Bool(b) => Sample::Bool(*b),
            Value::Null => {
                debug!(column = value_column, row = i, "null value, skipping row");
                continue;
            }
            Value::Other(_) => {
                warn!(
                    column = value_column,
                    row = i,
                    found = value.type_name(),
                    value = %value,
                    "unsupported value type, skipping row"
                );
                continue;
            }
        };

        let time = parse_time(time_column, row).inspect_err(|err| {
            warn!(column = time_column, row = i, error = %err, "bad timestamp");
        })?;

        match sample {
            Sample::Float(f) => floats.push(time, f),
            Sample::String(s) => strings.push(time, s.to_string()),
            Sample::Bool(b) => bools.push(time, b),
        }
    }

    let (times, values, dropped) = if floats.len() > 0 {
        let dropped = strings.len() + bools.len();
        (floats.times, FieldValues::Float(floats.values), dropped)
    } else if strings.len() > 0 {
        (strings.times, FieldValues::String(strings.values), bools.len())
    } else if bools.len() > 0 {
        (bools.times, FieldValues::Bool(bools.values), 0)
    } else {
        return Err(ExtractError::NoValues(value_column.to_string()));
    };

    if dropped > 0 {
        warn!(
            column = value_column,
            kept = values.type_name(),
            dropped,
            "column holds mixed types"
        );
    }

    let labels = partition.labels();
    Ok(Extracted {
        time: Field::new("time", labels.clone(), FieldValues::Time(times)),
        value: Field::new(value_column, labels, values),
        dropped,
    })
}

/// Parse the RFC 3339 timestamp held in `column`, normalised to UTC.
pub fn parse_time(column: &str, row: &Row) -> Result<DateTime<Utc>, ExtractError> {
    match row.get(column) {
        None => Err(ExtractError::TimeColumnMissing(column.to_string())),
        Some(Value::String(raw)) => {
            let t = DateTime::parse_from_rfc3339(raw).map_err(|source| {
                ExtractError::InvalidTimestamp {
                    raw: raw.clone(),
                    source,
                }
            })?;
            if !canonical(raw) {
                return Err(ExtractError::TimestampNotCanonical(raw.clone()));
            }
            Ok(t.with_timezone(&Utc))
        }
        Some(other) => Err(ExtractError::TimeColumnType {
            column: column.to_string(),
            found: other.type_name(),
            raw: other.to_string(),
        }),
    }
}

// chrono's reader also takes `2024-01-01 00:00:00Z` and lower-case `t`/`z`.
fn canonical(raw: &str) -> bool {
    raw.as_bytes().get(10) == Some(&b'T') && !raw.ends_with('z')
}
