use std::io::Write;

use chrono::{TimeZone, Utc};
use rowframe::client::transform::{replay, Replay};
use rowframe::error::Status;
use rowframe::frame::FieldValues;
use rowframe::query::TimeRange;
use rowframe::transform::UnlabeledRows;

fn write_json(value: serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();
    file
}

fn range() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 24, 3, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 24, 4, 0, 0).unwrap(),
    )
}

fn recorded_response() -> serde_json::Value {
    serde_json::json!({
        "results": [
            {"ts": "2024-01-24T03:10:00Z", "host": "a", "cpu": 0.5},
            {"ts": "2024-01-24T03:11:00Z", "host": "a", "cpu": 0.7},
            {"ts": "2024-01-24T03:10:00Z", "cpu": 0.9},
            {"ts": "2024-01-24T03:10:00Z", "host": "b", "cpu": 0.1}
        ],
        "column_fields": [
            {"name": "ts", "type": ""},
            {"name": "host", "type": ""},
            {"name": "cpu", "type": ""}
        ],
        "pagination": {"next_cursor": "abc"},
        "warnings": ["slow query"]
    })
}

#[tokio::test]
async fn test_replay_recorded_response() {
    let query = write_json(serde_json::json!({
        "queryText": "SELECT ts, host, cpu FROM usage",
        "queryTimeField": "ts",
        "queryLabelColumn": "host"
    }));
    let response = write_json(recorded_response());

    let out = replay(Replay {
        query: query.path(),
        response: response.path(),
        ref_id: "A",
        range: range(),
        unlabeled_rows: UnlabeledRows::Exclude,
    })
    .await
    .unwrap();

    let a = &out.responses["A"];
    assert_eq!(a.status, Status::Ok);
    assert_eq!(a.frames.len(), 2);
    assert_eq!(
        a.frames[0].field("cpu").unwrap().values,
        FieldValues::Float(vec![0.5, 0.7])
    );
    assert_eq!(
        a.frames[1].field("cpu").unwrap().values,
        FieldValues::Float(vec![0.1])
    );

    let notices: Vec<&str> = a.frames[0]
        .meta
        .notices
        .iter()
        .map(|n| n.text.as_str())
        .collect();
    assert!(notices.iter().any(|n| n.starts_with("pagination needed")));
    assert!(notices.contains(&"slow query"));
}

#[tokio::test]
async fn test_replay_includes_unlabeled_rows_by_default() {
    let query = write_json(serde_json::json!({
        "queryText": "SELECT ts, host, cpu FROM usage",
        "queryTimeField": "ts",
        "queryLabelColumn": "host"
    }));
    let response = write_json(recorded_response());

    let out = replay(Replay {
        query: query.path(),
        response: response.path(),
        ref_id: "A",
        range: range(),
        unlabeled_rows: UnlabeledRows::Include,
    })
    .await
    .unwrap();

    let a = &out.responses["A"];
    assert_eq!(
        a.frames[0].field("cpu").unwrap().values,
        FieldValues::Float(vec![0.5, 0.7, 0.9])
    );
    assert_eq!(
        a.frames[1].field("cpu").unwrap().values,
        FieldValues::Float(vec![0.9, 0.1])
    );
}

#[tokio::test]
async fn test_replay_reports_unreadable_files() {
    let query = write_json(serde_json::json!({"queryText": "q"}));
    let missing = std::path::Path::new("/nonexistent/response.json");

    let err = replay(Replay {
        query: query.path(),
        response: missing,
        ref_id: "A",
        range: range(),
        unlabeled_rows: UnlabeledRows::Include,
    })
    .await
    .err()
    .unwrap();
    assert!(err.to_string().contains("failed to read"));
}
