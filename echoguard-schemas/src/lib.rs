//! Persisted Artifacts for Prepared Telemetry
//!
//! ## Overview
//!
//! A preparation run produces three things that outlive the process:
//!
//! 1. **Window artifact**: N windows of T × F normalized values plus a
//!    parallel label array, consumed by the sequence and reconstruction
//!    models
//! 2. **Aggregate table**: one row per device and bin with the 20 rolling
//!    statistics, consumed by the tabular model
//! 3. **Normalization blobs**: the frozen imputation and scaling
//!    parameters, loaded at inference time without the fitting code
//!
//! ## Why Avro?
//!
//! The window and aggregate artifacts are Avro object containers:
//!
//! 1. **Self-Describing**: The schema travels with the data, so a reader in
//!    another language can decode a file years later
//! 2. **Compact Binary Format**: Windows are large and mostly doubles
//! 3. **Schema Evolution**: New fields get defaults; old files stay readable
//!
//! The normalization blobs are small JSON documents instead, one per
//! parameter set, so each can be inspected by hand and loaded on its own.
//!
//! ## Layout
//!
//! | Artifact        | Format | Schema / shape                                   |
//! |-----------------|--------|--------------------------------------------------|
//! | windows         | Avro   | `WindowRecord { label: int, values: [double] }`  |
//! | aggregates      | Avro   | `AggregateRow { device_id, device_type, timestamp, label, 20 × double }` |
//! | `imputer.json`  | JSON   | `{ version, medians: [F] }`                      |
//! | `scaler.json`   | JSON   | `{ version, center: [F], scale: [F] }`           |
//!
//! Window files carry `window_size` and `channel_count` in the container
//! header so an empty artifact still records its shape. Artifacts with no
//! records are still complete containers: header, no data blocks.
//!
//! ## Usage Example
//!
//! ```no_run
//! use echoguard_core::{prepare_dataset, CancellationToken, PipelineConfig};
//! use echoguard_schemas::{save_aggregates, save_normalization, save_windows};
//! # let readings = Vec::new();
//!
//! let dataset = prepare_dataset(&readings, &PipelineConfig::default(), &CancellationToken::new())?;
//!
//! save_windows(&dataset.windows, "artifacts/windows.avro")?;
//! save_aggregates(&dataset.aggregates, "artifacts/aggregates.avro")?;
//! save_normalization(&dataset.state, "artifacts")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use apache_avro::types::Value;
use apache_avro::{to_avro_datum, Schema};
use thiserror::Error;

pub mod aggregates;
pub mod normalization;
pub mod schemas;
pub mod windows;

pub use aggregates::{decode_aggregates, encode_aggregates, load_aggregates, save_aggregates};
pub use normalization::{
    load_imputer, load_normalization, load_scaler, save_normalization, IMPUTER_FILE, SCALER_FILE,
};
pub use windows::{decode_windows, encode_windows, load_windows, save_windows};

/// Result type for artifact operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Artifact persistence errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Avro encoding error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse schema: {0}")]
    Schema(String),

    #[error("Malformed record {index}: {reason}")]
    Shape { index: usize, reason: String },

    #[error("{artifact} has version {found}, expected {expected}")]
    Version {
        artifact: &'static str,
        found: u32,
        expected: u32,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Object container magic
const AVRO_MAGIC: &[u8; 4] = b"Obj\x01";

/// Sync marker for containers with no data blocks; never matched by a reader
const EMPTY_SYNC_MARKER: [u8; 16] = *b"echoguard-empty\0";

/// Header-only object container for an artifact with no records.
///
/// `Writer` only emits the header together with the first record, so an
/// empty writer produces zero bytes that no reader accepts. This writes the
/// same header by hand: magic, metadata map, sync marker.
pub(crate) fn empty_container(
    schema: &Schema,
    user_metadata: &[(&str, String)],
) -> ArtifactResult<Vec<u8>> {
    let mut metadata: HashMap<String, Value> = user_metadata
        .iter()
        .map(|(key, value)| (key.to_string(), Value::Bytes(value.as_bytes().to_vec())))
        .collect();
    metadata.insert(
        "avro.schema".to_string(),
        Value::Bytes(serde_json::to_string(schema)?.into_bytes()),
    );
    metadata.insert("avro.codec".to_string(), Value::Bytes(b"null".to_vec()));

    let mut bytes = AVRO_MAGIC.to_vec();
    bytes.extend(to_avro_datum(&Schema::Map(Box::new(Schema::Bytes)), Value::Map(metadata))?);
    bytes.extend_from_slice(&EMPTY_SYNC_MARKER);
    Ok(bytes)
}
