use std::collections::HashSet;

use tracing::{debug, error, info};

use super::{
    extract_column, partition_labels, resolve_column_type, ColumnType, Partition, UnlabeledRows,
};
use crate::error::QueryError;
use crate::frame::{Field, FieldValues, Frame, FrameMeta, Notice, QueryStat};
use crate::model::{ResultSet, Row, Value};
use crate::query::{QueryDescriptor, QueryKind};

const SELECT_STAR: &str =
    "Query must not use 'SELECT *', instead explicitly specify the columns to return";

/// Stats and notices shared by every frame built from one result set.
pub fn frame_meta(query_text: &str, rs: &ResultSet) -> FrameMeta {
    let mut meta = FrameMeta {
        executed_query_string: query_text.to_string(),
        stats: vec![
            QueryStat {
                display_name: "query time".to_string(),
                unit: Some("ms".to_string()),
                value: rs.stats.elapsed_time_ms as f64,
            },
            QueryStat {
                display_name: "throttled time".to_string(),
                unit: Some("µs".to_string()),
                value: rs.stats.throttled_time_micros as f64,
            },
            QueryStat {
                display_name: "documents in the result".to_string(),
                unit: None,
                value: rs.rows.len() as f64,
            },
        ],
        notices: Vec::new(),
    };

    if rs.next_cursor().is_some() {
        meta.notices.push(Notice::warning(
            "pagination needed: the result was truncated, narrow the time range or add a LIMIT",
        ));
    }
    if !rs.query_errors.is_empty() {
        let messages: Vec<&str> = rs.query_errors.iter().map(|e| e.message.as_str()).collect();
        meta.notices.push(Notice::error(messages.join(", ")));
    }
    if !rs.warnings.is_empty() {
        meta.notices.push(Notice::warning(rs.warnings.join(", ")));
    }

    meta
}

/// One wide frame per label value.
pub fn metrics_frames(
    descriptor: &QueryDescriptor,
    rs: &ResultSet,
    unlabeled: UnlabeledRows,
) -> Result<Vec<Frame>, QueryError> {
    if rs.rows.is_empty() {
        return Err(QueryError::Validation("Query returned no rows".to_string()));
    }
    if rs.column_fields.is_empty() {
        return Err(QueryError::Validation(SELECT_STAR.to_string()));
    }

    let time_column = descriptor.time_column();
    let label_column = descriptor.label_column();
    let columns: Vec<&str> = rs
        .column_names()
        .filter(|c| *c != time_column && *c != label_column)
        .collect();

    let labels = partition_labels(label_column, &rs.rows);
    debug!(labels = ?labels, "extracted labels");

    let meta = frame_meta(&descriptor.query_text, rs);
    let mut frames = Vec::with_capacity(labels.len());
    for label in &labels {
        let partition = Partition::new(label_column, label, unlabeled);
        let built = wide_frames(
            QueryKind::Metrics.frame_name(),
            &meta,
            time_column,
            &columns,
            &partition,
            &rs.rows,
        )?;
        if built.is_empty() {
            debug!(label = %label, "no typed columns for label");
        }
        for frame in built {
            info!(label = %label, fields = frame.fields.len(), rows = frame.rows(), "adding frame");
            frames.push(frame);
        }
    }

    if frames.is_empty() {
        return Err(QueryError::Validation(
            "no usable columns found in query response".to_string(),
        ));
    }
    Ok(frames)
}

/// Ungrouped frames of marker events. Usually one; columns with their own
/// set of timestamps get a frame of their own.
pub fn annotation_frames(
    descriptor: &QueryDescriptor,
    rs: &ResultSet,
) -> Result<Vec<Frame>, QueryError> {
    if rs.column_fields.is_empty() {
        return Err(QueryError::Validation(SELECT_STAR.to_string()));
    }

    let name = QueryKind::Annotations.frame_name();
    let meta = frame_meta(&descriptor.query_text, rs);
    if rs.rows.is_empty() {
        return Ok(vec![Frame::new(name, meta)]);
    }

    let time_column = descriptor.time_column();
    let label_column = descriptor.label_column();
    let columns: Vec<&str> = rs
        .column_names()
        .filter(|c| *c != time_column && *c != label_column)
        .collect();
    let frames = wide_frames(
        name,
        &meta,
        time_column,
        &columns,
        &Partition::all(),
        &rs.rows,
    )?;
    if frames.is_empty() {
        return Ok(vec![Frame::new(name, meta)]);
    }
    Ok(frames)
}

/// Distinct string values of the only column, for template variables.
pub fn variable_frame(query_text: &str, rs: &ResultSet) -> Result<Frame, QueryError> {
    if rs.rows.is_empty() {
        return Err(QueryError::Empty("got empty query response".to_string()));
    }
    if rs.column_fields.is_empty() {
        return Err(QueryError::Validation(SELECT_STAR.to_string()));
    }
    if rs.column_fields.len() != 1 {
        return Err(QueryError::Validation(format!(
            "expected exactly one column, got {}",
            rs.column_fields.len()
        )));
    }

    let column = rs.column_fields[0].name.as_str();
    let values = distinct_strings(column, &rs.rows);
    if values.is_empty() {
        return Err(QueryError::Validation(format!(
            "column {} contains no string values",
            column
        )));
    }

    let mut frame = Frame::new(QueryKind::Variables.frame_name(), frame_meta(query_text, rs));
    frame.push_field(Field::new("variables", None, FieldValues::String(values)))?;
    Ok(frame)
}

fn distinct_strings(column: &str, rows: &[Row]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match row.get(column) {
            Some(Value::String(s)) => {
                if seen.insert(s.as_str()) {
                    values.push(s.clone());
                }
            }
            other => {
                let found = other.map(Value::type_name).unwrap_or("absent");
                debug!(column, row = i, found, "skipping non-string variable value");
            }
        }
    }
    values
}

/// Value columns extracted for one partition that share a time sequence.
struct Group {
    time: Field,
    values: Vec<Field>,
    notices: Vec<Notice>,
}

// Each typed column joins the first group whose timestamps match its own, so
// rows skipped for one column never misalign another. Groups keep the order
// of their first column. Empty when no column of the partition could be typed.
fn wide_frames(
    name: &str,
    meta: &FrameMeta,
    time_column: &str,
    columns: &[&str],
    partition: &Partition<'_>,
    rows: &[Row],
) -> Result<Vec<Frame>, QueryError> {
    let mut groups: Vec<Group> = Vec::new();

    for (i, column) in columns.iter().enumerate() {
        match resolve_column_type(column, rows.iter().filter(|r| partition.contains(r))) {
            ColumnType::Scalar(scalar) => {
                debug!(i, column, scalar = ?scalar, "processing column");
            }
            ColumnType::Untyped => {
                debug!(i, column, "skipping column without values");
                continue;
            }
            ColumnType::Unsupported(found) => {
                error!(i, column, found, "unknown type, dropping column");
                continue;
            }
        }

        let extracted = extract_column(time_column, column, partition, rows)?;
        let notice = (extracted.dropped > 0).then(|| {
            Notice::warning(format!(
                "column {}: {} values of other types were dropped",
                column, extracted.dropped
            ))
        });

        let matching = groups
            .iter()
            .position(|g| same_times(&g.time.values, &extracted.time.values));
        let group = match matching {
            Some(at) => &mut groups[at],
            None => {
                if !groups.is_empty() {
                    debug!(i, column, "column has its own timestamps, starting a new frame");
                }
                groups.push(Group {
                    time: extracted.time,
                    values: Vec::new(),
                    notices: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        group.values.push(extracted.value);
        group.notices.extend(notice);
    }

    let mut frames = Vec::with_capacity(groups.len());
    for group in groups {
        let mut frame = Frame::new(name, meta.clone());
        frame.meta.notices.extend(group.notices);
        frame.push_field(group.time)?;
        for field in group.values {
            frame.push_field(field)?;
        }
        frames.push(frame);
    }
    Ok(frames)
}

fn same_times(a: &FieldValues, b: &FieldValues) -> bool {
    match (a, b) {
        (FieldValues::Time(a), FieldValues::Time(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::frame::Severity;
    use crate::model::{ColumnField, Pagination, QueryStats, RowError};

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    fn result_set(columns: &[&str], rows: Vec<Row>) -> ResultSet {
        ResultSet {
            rows,
            column_fields: columns.iter().map(|c| ColumnField::named(*c)).collect(),
            ..Default::default()
        }
    }

    fn descriptor(label: &str) -> QueryDescriptor {
        QueryDescriptor {
            query_text: "SELECT time, v1, v2, v4 FROM t".to_string(),
            query_time_field: "time".to_string(),
            query_label_column: label.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> ResultSet {
        result_set(
            &["time", "v1", "v2", "v4"],
            vec![
                row(&[
                    ("time", "2024-01-23T19:25:17-08:00".into()),
                    ("v1", 1.111.into()),
                    ("v2", true.into()),
                    ("v4", "foo".into()),
                ]),
                row(&[
                    ("time", "2024-01-23T19:25:17-08:00".into()),
                    ("v1", 2.222.into()),
                    ("v2", false.into()),
                    ("v4", "bar".into()),
                ]),
                row(&[
                    ("time", "2024-01-23T19:26:17-08:00".into()),
                    ("v1", 3.333.into()),
                    ("v2", false.into()),
                    ("v4", "foo".into()),
                ]),
            ],
        )
    }

    #[test]
    fn meta_carries_stats_and_notices() {
        let rs = ResultSet {
            stats: QueryStats {
                elapsed_time_ms: 15,
                throttled_time_micros: 7,
            },
            query_errors: vec![
                RowError {
                    message: "bad doc".to_string(),
                    ..Default::default()
                },
                RowError {
                    message: "worse doc".to_string(),
                    ..Default::default()
                },
            ],
            warnings: vec!["w1".to_string(), "w2".to_string()],
            pagination: Some(Pagination {
                next_cursor: Some("next".to_string()),
            }),
            ..sample()
        };
        let meta = frame_meta("SELECT 1", &rs);
        assert_eq!(meta.executed_query_string, "SELECT 1");
        let stats: Vec<f64> = meta.stats.iter().map(|s| s.value).collect();
        assert_eq!(stats, vec![15.0, 7.0, 3.0]);
        assert_eq!(meta.notices.len(), 3);
        assert_eq!(meta.notices[0].severity, Severity::Warning);
        assert!(meta.notices[0].text.starts_with("pagination needed"));
        assert_eq!(meta.notices[1].severity, Severity::Error);
        assert_eq!(meta.notices[1].text, "bad doc, worse doc");
        assert_eq!(meta.notices[2].text, "w1, w2");
    }

    #[test]
    fn meta_without_diagnostics_has_no_notices() {
        let meta = frame_meta("q", &sample());
        assert_eq!(meta.stats.len(), 3);
        assert!(meta.notices.is_empty());
    }

    #[test]
    fn metrics_one_frame_per_label() {
        let frames = metrics_frames(&descriptor("v4"), &sample(), UnlabeledRows::Include).unwrap();
        assert_eq!(frames.len(), 2);

        let foo = &frames[0];
        assert_eq!(foo.name, "metrics");
        let names: Vec<&str> = foo.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "v1", "v2"]);
        assert_eq!(foo.rows(), 2);
        assert_eq!(
            foo.field("v1").unwrap().values,
            FieldValues::Float(vec![1.111, 3.333])
        );
        assert_eq!(
            foo.field("v2").unwrap().values,
            FieldValues::Bool(vec![true, false])
        );
        assert_eq!(
            foo.field("v1").unwrap().labels.as_ref().unwrap()["v4"],
            "foo"
        );

        let bar = &frames[1];
        assert_eq!(bar.rows(), 1);
        assert_eq!(
            bar.field("v1").unwrap().values,
            FieldValues::Float(vec![2.222])
        );
    }

    #[test]
    fn metrics_without_label_is_one_frame() {
        let frames = metrics_frames(&descriptor(""), &sample(), UnlabeledRows::Include).unwrap();
        assert_eq!(frames.len(), 1);
        let names: Vec<&str> = frames[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "v1", "v2", "v4"]);
        assert_eq!(frames[0].rows(), 3);
        assert_eq!(frames[0].fields[1].labels, None);
    }

    #[test]
    fn metrics_rejects_empty_results() {
        let rs = result_set(&["time", "v1"], vec![]);
        let err = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap_err();
        assert_eq!(err.status(), Status::ValidationFailed);
        assert_eq!(err.to_string(), "Query returned no rows");
    }

    #[test]
    fn metrics_rejects_select_star() {
        let mut rs = sample();
        rs.column_fields.clear();
        let err = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap_err();
        assert_eq!(err.status(), Status::ValidationFailed);
        assert!(err.to_string().contains("SELECT *"));
    }

    fn cpu_mem(mem: Value) -> ResultSet {
        result_set(
            &["time", "cpu", "mem"],
            vec![
                row(&[
                    ("time", "2024-01-01T00:00:00Z".into()),
                    ("cpu", 0.1.into()),
                    ("mem", 10.0.into()),
                ]),
                row(&[
                    ("time", "2024-01-01T00:01:00Z".into()),
                    ("cpu", 0.2.into()),
                    ("mem", mem),
                ]),
                row(&[
                    ("time", "2024-01-01T00:02:00Z".into()),
                    ("cpu", 0.3.into()),
                    ("mem", 30.0.into()),
                ]),
            ],
        )
    }

    fn names(frame: &Frame) -> Vec<&str> {
        frame.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn sparse_column_gets_its_own_frame() {
        for mem in [Value::Null, Value::from("n/a")] {
            let rs = cpu_mem(mem);
            let frames = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap();
            assert_eq!(frames.len(), 2);

            assert_eq!(names(&frames[0]), ["time", "cpu"]);
            assert_eq!(frames[0].rows(), 3);
            assert_eq!(
                frames[0].field("cpu").unwrap().values,
                FieldValues::Float(vec![0.1, 0.2, 0.3])
            );

            assert_eq!(names(&frames[1]), ["time", "mem"]);
            assert_eq!(frames[1].rows(), 2);
            assert_eq!(
                frames[1].field("mem").unwrap().values,
                FieldValues::Float(vec![10.0, 30.0])
            );
            for frame in &frames {
                let len = frame.rows();
                assert!(frame.fields.iter().all(|f| f.len() == len));
            }
        }
    }

    #[test]
    fn mixed_type_notice_stays_with_its_column() {
        let frames =
            metrics_frames(&descriptor(""), &cpu_mem("n/a".into()), UnlabeledRows::Include)
                .unwrap();
        assert!(frames[0].meta.notices.is_empty());
        assert_eq!(
            frames[1].meta.notices,
            vec![Notice::warning("column mem: 1 values of other types were dropped")]
        );
    }

    #[test]
    fn missing_key_gets_its_own_frame() {
        let rs = result_set(
            &["time", "a", "b"],
            vec![
                row(&[
                    ("time", "2024-01-01T00:00:00Z".into()),
                    ("a", 1.0.into()),
                    ("b", 1.0.into()),
                ]),
                row(&[("time", "2024-01-01T00:01:00Z".into()), ("a", 2.0.into())]),
            ],
        );
        let frames = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].rows(), 2);
        assert_eq!(frames[1].rows(), 1);
    }

    #[test]
    fn columns_with_equal_timestamps_share_a_frame() {
        let rs = result_set(
            &["time", "a", "b", "c"],
            vec![
                row(&[
                    ("time", "2024-01-01T00:00:00Z".into()),
                    ("a", 1.0.into()),
                    ("c", "x".into()),
                ]),
                row(&[
                    ("time", "2024-01-01T00:01:00Z".into()),
                    ("b", 2.0.into()),
                ]),
            ],
        );
        let frames = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(names(&frames[0]), ["time", "a", "c"]);
        assert_eq!(names(&frames[1]), ["time", "b"]);
    }

    #[test]
    fn untyped_and_nested_columns_are_skipped() {
        let rs = result_set(
            &["time", "v", "empty", "doc"],
            vec![row(&[
                ("time", "2024-01-01T00:00:00Z".into()),
                ("v", 1.0.into()),
                ("empty", Value::Null),
                ("doc", Value::Other(serde_json::json!({"k": 1}))),
            ])],
        );
        let frames = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap();
        let names: Vec<&str> = frames[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "v"]);
    }

    #[test]
    fn no_typed_columns_is_validation_error() {
        let rs = result_set(
            &["time", "v"],
            vec![row(&[("time", "2024-01-01T00:00:00Z".into()), ("v", Value::Null)])],
        );
        let err = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap_err();
        assert_eq!(err.status(), Status::ValidationFailed);
        assert_eq!(err.to_string(), "no usable columns found in query response");
    }

    #[test]
    fn bad_timestamp_fails_the_query() {
        let rs = result_set(
            &["time", "v"],
            vec![
                row(&[("time", "2024-01-01T00:00:00Z".into()), ("v", 1.0.into())]),
                row(&[("time", 12.0.into()), ("v", 2.0.into())]),
            ],
        );
        let err = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap_err();
        assert_eq!(err.status(), Status::Internal);
        assert!(err.to_string().contains("not the expected type 'string'"));
    }

    #[test]
    fn mixed_types_add_a_warning_notice() {
        let rs = result_set(
            &["time", "v"],
            vec![
                row(&[("time", "2024-01-01T00:00:00Z".into()), ("v", 1.0.into())]),
                row(&[("time", "2024-01-01T00:01:00Z".into()), ("v", "x".into())]),
            ],
        );
        let frames = metrics_frames(&descriptor(""), &rs, UnlabeledRows::Include).unwrap();
        assert_eq!(frames[0].rows(), 1);
        assert_eq!(
            frames[0].meta.notices,
            vec![Notice::warning("column v: 1 values of other types were dropped")]
        );
    }

    #[test]
    fn annotations_use_default_time_column() {
        let rs = result_set(
            &["_event_time", "text"],
            vec![
                row(&[
                    ("_event_time", "2024-01-01T00:00:00Z".into()),
                    ("text", "deploy".into()),
                ]),
                row(&[
                    ("_event_time", "2024-01-01T01:00:00Z".into()),
                    ("text", "rollback".into()),
                ]),
            ],
        );
        let qd = QueryDescriptor::default();
        let frames = annotation_frames(&qd, &rs).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.name, "annotations");
        let names: Vec<&str> = frame.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["time", "text"]);
        assert_eq!(frame.fields[1].labels, None);
        assert_eq!(frame.rows(), 2);
    }

    #[test]
    fn empty_annotation_window_is_not_an_error() {
        let rs = result_set(&["_event_time", "text"], vec![]);
        let frames = annotation_frames(&QueryDescriptor::default(), &rs).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fields.is_empty());
        assert_eq!(frames[0].meta.stats.len(), 3);
    }

    #[test]
    fn annotations_leave_out_the_label_column() {
        let rs = result_set(
            &["time", "text", "host"],
            vec![row(&[
                ("time", "2024-01-01T00:00:00Z".into()),
                ("text", "deploy".into()),
                ("host", "a".into()),
            ])],
        );
        let frames = annotation_frames(&descriptor("host"), &rs).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(names(&frames[0]), ["time", "text"]);
        assert_eq!(frames[0].fields[1].labels, None);
    }

    #[test]
    fn variables_are_distinct_in_order() {
        let rs = result_set(
            &["name"],
            vec![
                row(&[("name", "a".into())]),
                row(&[("name", "b".into())]),
                row(&[("name", "a".into())]),
                row(&[("name", 3.0.into())]),
            ],
        );
        let frame = variable_frame("SELECT name FROM t", &rs).unwrap();
        assert_eq!(frame.fields.len(), 1);
        assert_eq!(
            frame.fields[0].values,
            FieldValues::String(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn variables_reject_bad_shapes() {
        let err = variable_frame("q", &result_set(&["name"], vec![])).unwrap_err();
        assert_eq!(err.status(), Status::Unknown);
        assert!(err.to_string().contains("empty"));

        let rs = result_set(&["a", "b"], vec![row(&[("a", "x".into()), ("b", "y".into())])]);
        let err = variable_frame("q", &rs).unwrap_err();
        assert_eq!(err.status(), Status::ValidationFailed);
        assert_eq!(err.to_string(), "expected exactly one column, got 2");

        let rs = result_set(&["a"], vec![row(&[("a", 1.0.into())])]);
        let err = variable_frame("q", &rs).unwrap_err();
        assert_eq!(err.status(), Status::ValidationFailed);
    }
}
