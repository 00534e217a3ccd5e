//! EchoGuard Avro schemas for prepared datasets
//!
//! Schemas follow the `name_vN` convention. A new version is added next to
//! the old one, never edited in place, so artifacts written by an earlier
//! preparation run stay readable.

use apache_avro::Schema;
use serde_json::{json, Value};

use echoguard_core::constants::channels::FEATURE_NAMES;

use crate::ArtifactError;

/// One normalized window with its label
pub fn window_record_v1() -> Result<Schema, ArtifactError> {
    let schema_json = json!({
        "namespace": "io.echoguard.prepared.v1",
        "type": "record",
        "name": "WindowRecord",
        "doc": "One T x F window, row-major, after imputation and scaling",
        "fields": [
            {
                "name": "label",
                "type": "int",
                "doc": "Maximum severity over the window: 0 normal, 1 pre-failure, 2 failure"
            },
            {
                "name": "values",
                "type": {"type": "array", "items": "double"},
                "doc": "window_size x channel_count values, row-major"
            }
        ]
    });

    Schema::parse(&schema_json).map_err(|e| ArtifactError::Schema(e.to_string()))
}

/// One aggregate feature row keyed by device and bin
pub fn aggregate_row_v1() -> Result<Schema, ArtifactError> {
    let mut fields = vec![
        json!({"name": "device_id", "type": "string"}),
        json!({"name": "device_type", "type": "string"}),
        json!({
            "name": "timestamp",
            "type": {"type": "long", "logicalType": "timestamp-millis"},
            "doc": "Bin start"
        }),
        json!({
            "name": "label",
            "type": "int",
            "doc": "The bin's own severity label"
        }),
    ];
    fields.extend(FEATURE_NAMES.iter().map(|name| {
        json!({
            "name": name,
            "type": "double",
            "doc": "NaN where the trailing window had too few observations"
        })
    }));

    let schema_json = json!({
        "namespace": "io.echoguard.prepared.v1",
        "type": "record",
        "name": "AggregateRow",
        "doc": "Rolling per-channel statistics for one resampled bin",
        "fields": Value::Array(fields)
    });

    Schema::parse(&schema_json).map_err(|e| ArtifactError::Schema(e.to_string()))
}
