use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::{Row, Value};

/// Distinct values of `label_column`, in the order they first appear.
///
/// An empty label column means "no grouping" and yields the single partition
/// `""`. A label column that never holds a string degrades the same way.
pub fn partition_labels(label_column: &str, rows: &[Row]) -> Vec<String> {
    if label_column.is_empty() {
        return vec![String::new()];
    }

    let mut labels = Vec::new();
    let mut seen = HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        match row.get(label_column) {
            Some(Value::String(label)) => {
                if seen.insert(label.as_str()) {
                    labels.push(label.clone());
                }
            }
            Some(other) => {
                debug!(
                    column = label_column,
                    row = i,
                    found = other.type_name(),
                    "label value is not a string"
                );
            }
            None => debug!(column = label_column, row = i, "row has no label"),
        }
    }

    if labels.is_empty() {
        warn!(
            column = label_column,
            "label column doesn't contain any string values"
        );
        return vec![String::new()];
    }

    labels
}
