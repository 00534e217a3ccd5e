//! Aggregate table encoding
//!
//! Missing statistics are written as NaN and read back as missing.

use std::path::Path;

use apache_avro::types::{Record, Value};
use apache_avro::{Reader, Writer};
use log::debug;

use echoguard_core::constants::channels::{CHANNEL_COUNT, FEATURE_NAMES, STATISTIC_COUNT};
use echoguard_core::{AggregateFeatureRow, Label};

use crate::schemas::aggregate_row_v1;
use crate::{empty_container, ArtifactError, ArtifactResult};

/// Encode aggregate rows into an Avro object container
pub fn encode_aggregates(rows: &[AggregateFeatureRow]) -> ArtifactResult<Vec<u8>> {
    let schema = aggregate_row_v1()?;
    if rows.is_empty() {
        return empty_container(&schema, &[]);
    }

    let mut writer = Writer::new(&schema, Vec::new());

    for row in rows {
        let mut record = Record::new(&schema)
            .ok_or_else(|| ArtifactError::Schema("aggregate schema is not a record".to_string()))?;
        record.put("device_id", Value::String(row.device_id.clone()));
        record.put("device_type", Value::String(row.device_type.clone()));
        record.put("timestamp", Value::TimestampMillis(row.timestamp));
        record.put("label", Value::Int(i32::from(row.label.code())));
        for (name, value) in FEATURE_NAMES.iter().zip(row.feature_vector()) {
            record.put(name, Value::Double(value.unwrap_or(f64::NAN)));
        }
        writer.append(record)?;
    }

    Ok(writer.into_inner()?)
}

/// Decode an Avro object container written by `encode_aggregates`
pub fn decode_aggregates(bytes: &[u8]) -> ArtifactResult<Vec<AggregateFeatureRow>> {
    let schema = aggregate_row_v1()?;
    let reader = Reader::with_schema(&schema, bytes)?;

    let mut rows = Vec::new();
    for (index, value) in reader.enumerate() {
        rows.push(aggregate_fields(index, value?)?);
    }
    debug!("decoded {} aggregate rows", rows.len());
    Ok(rows)
}

fn aggregate_fields(index: usize, value: Value) -> ArtifactResult<AggregateFeatureRow> {
    let shape = |reason: String| ArtifactError::Shape { index, reason };

    let Value::Record(fields) = value else {
        return Err(shape("not a record".to_string()));
    };

    let mut device_id = None;
    let mut device_type = None;
    let mut timestamp = None;
    let mut label = None;
    let mut stats = [[None; STATISTIC_COUNT]; CHANNEL_COUNT];
    let mut seen = 0usize;

    for (name, field) in fields {
        match (name.as_str(), field) {
            ("device_id", Value::String(s)) => device_id = Some(s),
            ("device_type", Value::String(s)) => device_type = Some(s),
            ("timestamp", Value::TimestampMillis(ts)) | ("timestamp", Value::Long(ts)) => {
                timestamp = Some(ts)
            }
            ("label", Value::Int(code)) => {
                let code = u8::try_from(code).map_err(|_| shape(format!("label {}", code)))?;
                label = Some(Label::try_from(code).map_err(shape)?);
            }
            (column, Value::Double(v)) => {
                let idx = FEATURE_NAMES
                    .iter()
                    .position(|n| *n == column)
                    .ok_or_else(|| shape(format!("unknown column {}", column)))?;
                stats[idx / STATISTIC_COUNT][idx % STATISTIC_COUNT] =
                    if v.is_nan() { None } else { Some(v) };
                seen += 1;
            }
            (column, other) => {
                return Err(shape(format!("unexpected value for {}: {:?}", column, other)));
            }
        }
    }

    if seen != FEATURE_NAMES.len() {
        return Err(shape(format!(
            "{} statistic columns, expected {}",
            seen,
            FEATURE_NAMES.len()
        )));
    }

    match (device_id, device_type, timestamp, label) {
        (Some(device_id), Some(device_type), Some(timestamp), Some(label)) => {
            Ok(AggregateFeatureRow {
                device_id,
                device_type,
                timestamp,
                label,
                stats,
            })
        }
        _ => Err(shape("missing identity or label column".to_string())),
    }
}

/// Write aggregate rows to `path`
pub fn save_aggregates(rows: &[AggregateFeatureRow], path: impl AsRef<Path>) -> ArtifactResult<()> {
    let path = path.as_ref();
    let bytes = encode_aggregates(rows)?;
    std::fs::write(path, bytes).map_err(|e| ArtifactError::io(path, e))?;
    debug!("wrote {} aggregate rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read aggregate rows from `path`
pub fn load_aggregates(path: impl AsRef<Path>) -> ArtifactResult<Vec<AggregateFeatureRow>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
    decode_aggregates(&bytes)
}
