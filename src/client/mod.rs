pub mod query;
pub mod transform;

use chrono::{DateTime, Duration, Utc};

use crate::cli::{OutputFormat, QueryArgs};
use crate::datasource::QueryDataResponse;
use crate::frame::{Field, Frame};
use crate::query::{QueryDescriptor, TimeRange};

/// Parse a time specification relative to `now`.
///
/// Supported formats:
/// - `now`
/// - Relative: `30s`, `5m`, `1h`, `2d` (interpreted as now - duration)
/// - Absolute: RFC3339 string like `2024-01-01T00:00:00Z`
pub fn parse_time_spec(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s_trimmed = s.trim();
    if s_trimmed == "now" {
        return Ok(now);
    }

    const UNITS: &[(char, i64)] = &[('s', 1), ('m', 60), ('h', 3600), ('d', 86400)];
    for &(suffix, multiplier) in UNITS {
        if let Some(num_str) = s_trimmed.strip_suffix(suffix) {
            if let Ok(n) = num_str.parse::<i64>() {
                return Ok(now - Duration::seconds(n * multiplier));
            }
        }
    }

    let dt = DateTime::parse_from_rfc3339(s_trimmed)
        .map_err(|e| anyhow::anyhow!("invalid time spec '{}': {}", s, e))?;
    Ok(dt.with_timezone(&Utc))
}

pub fn parse_time_range(from: &str, to: &str) -> anyhow::Result<TimeRange> {
    let now = Utc::now();
    let range = TimeRange::new(parse_time_spec(from, now)?, parse_time_spec(to, now)?);
    if range.from > range.to {
        anyhow::bail!("time range starts after it ends: {} > {}", from, to);
    }
    Ok(range)
}

/// Build the query model the server expects from command-line flags.
pub fn descriptor(sql: &str, args: &QueryArgs) -> QueryDescriptor {
    QueryDescriptor {
        query_text: sql.to_string(),
        query_time_field: args.time_column.clone().unwrap_or_default(),
        query_label_column: args.label_column.clone().unwrap_or_default(),
        query_param_start: args.param_start.clone().unwrap_or_default(),
        query_param_stop: args.param_stop.clone().unwrap_or_default(),
        interval_ms: args.interval_ms,
        max_data_points: args.max_data_points,
    }
}

pub fn print_response(response: &QueryDataResponse, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Text => print_response_text(response),
    }
    Ok(())
}

fn print_response_text(response: &QueryDataResponse) {
    for (ref_id, slot) in &response.responses {
        println!("Query: {} (status {})", ref_id, slot.status.code());
        if let Some(err) = &slot.error {
            println!("  Error: {}", err.replace('\n', "\n         "));
        }
        for frame in &slot.frames {
            print_frame_text(frame);
        }
    }
}

fn print_frame_text(frame: &Frame) {
    println!("  Frame: {} ({} rows)", frame.name, frame.rows());
    for stat in &frame.meta.stats {
        match &stat.unit {
            Some(unit) => println!("    {}: {} {}", stat.display_name, stat.value, unit),
            None => println!("    {}: {}", stat.display_name, stat.value),
        }
    }
    for notice in &frame.meta.notices {
        println!("    [{:?}] {}", notice.severity, notice.text);
    }
    if frame.fields.is_empty() {
        return;
    }

    let header: Vec<String> = frame.fields.iter().map(field_header).collect();
    println!("    {}", header.join("\t"));
    for row in 0..frame.rows() {
        let cells: Vec<String> = frame
            .fields
            .iter()
            .map(|f| f.values.display_at(row).unwrap_or_default())
            .collect();
        println!("    {}", cells.join("\t"));
    }
}

fn field_header(field: &Field) -> String {
    match &field.labels {
        Some(labels) if !labels.is_empty() => {
            let pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}{{{}}}", field.name, pairs.join(","))
        }
        _ => field.name.clone(),
    }
}
