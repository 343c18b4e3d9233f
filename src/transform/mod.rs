//! Reshaping of query results into labeled, typed, wide-format frames.
//!
//! Everything in here is synchronous and pure apart from `tracing` events;
//! the caller opens the span that ties those events to a query.

pub mod assemble;
pub mod columns;
pub mod extract;
pub mod labels;

use serde::{Deserialize, Serialize};

use crate::frame::Labels;
use crate::model::{Row, Value};

pub use assemble::{annotation_frames, frame_meta, metrics_frames, variable_frame};
pub use columns::{resolve_column_type, ColumnType, ScalarType};
pub use extract::{extract_column, parse_time, Extracted};
pub use labels::partition_labels;

/// What to do with rows that lack the label column when grouping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum UnlabeledRows {
    /// Count the row in every partition.
    #[default]
    Include,
    /// Leave the row out of all partitions.
    Exclude,
}

/// The subset of rows sharing one label value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition<'a> {
    label_column: &'a str,
    label: &'a str,
    unlabeled: UnlabeledRows,
}

impl<'a> Partition<'a> {
    /// Every row, no labels on the output fields.
    pub fn all() -> Self {
        Self {
            label_column: "",
            label: "",
            unlabeled: UnlabeledRows::Include,
        }
    }

    /// An empty `label` is the ungrouped sentinel produced by
    /// [`partition_labels`] and selects every row.
    pub fn new(label_column: &'a str, label: &'a str, unlabeled: UnlabeledRows) -> Self {
        if label.is_empty() {
            return Self::all();
        }
        Self {
            label_column,
            label,
            unlabeled,
        }
    }

    pub fn is_grouped(&self) -> bool {
        !self.label_column.is_empty()
    }

    pub fn contains(&self, row: &Row) -> bool {
        if !self.is_grouped() {
            return true;
        }
        match row.get(self.label_column) {
            Some(Value::String(l)) => l == self.label,
            Some(_) => false,
            None => self.unlabeled == UnlabeledRows::Include,
        }
    }

    /// Label metadata for fields extracted from this partition.
    pub fn labels(&self) -> Option<Labels> {
        if !self.is_grouped() {
            return None;
        }
        let mut labels = Labels::new();
        labels.insert(self.label_column.to_string(), self.label.to_string());
        Some(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ungrouped_partition_takes_every_row() {
        let p = Partition::new("host", "", UnlabeledRows::Exclude);
        assert!(!p.is_grouped());
        assert!(p.contains(&Row::new()));
        assert!(p.contains(&[("host", "a")].into_iter().collect()));
        assert_eq!(p.labels(), None);
    }

    #[test]
    fn grouped_partition_matches_label() {
        let p = Partition::new("host", "a", UnlabeledRows::Include);
        assert!(p.contains(&[("host", "a")].into_iter().collect()));
        assert!(!p.contains(&[("host", "b")].into_iter().collect()));
        assert!(!p.contains(&[("host", Value::Number(1.0))].into_iter().collect()));
        assert_eq!(p.labels().unwrap().get("host").map(String::as_str), Some("a"));
    }

    #[test]
    fn unlabeled_rows_follow_policy() {
        let row = Row::new();
        assert!(Partition::new("host", "a", UnlabeledRows::Include).contains(&row));
        assert!(!Partition::new("host", "a", UnlabeledRows::Exclude).contains(&row));
    }
}
