//! Window artifact encoding
//!
//! One `WindowRecord` per window. The window shape lives in the container
//! header; every record is checked against it on load.

use std::path::Path;

use apache_avro::types::{Record, Value};
use apache_avro::{Reader, Writer};
use log::debug;

use echoguard_core::constants::channels::CHANNEL_COUNT;
use echoguard_core::{Frame, Label, WindowArtifact};

use crate::schemas::window_record_v1;
use crate::{empty_container, ArtifactError, ArtifactResult};

/// Header key holding T
pub const WINDOW_SIZE_KEY: &str = "echoguard.window_size";

/// Header key holding F
pub const CHANNEL_COUNT_KEY: &str = "echoguard.channel_count";

/// Encode windows into an Avro object container
pub fn encode_windows(artifact: &WindowArtifact) -> ArtifactResult<Vec<u8>> {
    if artifact.windows.len() != artifact.labels.len() {
        return Err(ArtifactError::Shape {
            index: artifact.windows.len().min(artifact.labels.len()),
            reason: format!(
                "{} windows but {} labels",
                artifact.windows.len(),
                artifact.labels.len()
            ),
        });
    }

    let schema = window_record_v1()?;
    let header = [
        (WINDOW_SIZE_KEY, artifact.window_size.to_string()),
        (CHANNEL_COUNT_KEY, CHANNEL_COUNT.to_string()),
    ];
    if artifact.is_empty() {
        return empty_container(&schema, &header);
    }

    let mut writer = Writer::new(&schema, Vec::new());
    for (key, value) in &header {
        writer.add_user_metadata(key.to_string(), value)?;
    }

    for (index, (window, label)) in artifact.windows.iter().zip(&artifact.labels).enumerate() {
        if window.len() != artifact.window_size {
            return Err(ArtifactError::Shape {
                index,
                reason: format!("{} rows, expected {}", window.len(), artifact.window_size),
            });
        }

        let mut record = Record::new(&schema)
            .ok_or_else(|| ArtifactError::Schema("window schema is not a record".to_string()))?;
        record.put("label", Value::Int(i32::from(label.code())));
        record.put(
            "values",
            Value::Array(window.iter().flatten().map(|v| Value::Double(*v)).collect()),
        );
        writer.append(record)?;
    }

    Ok(writer.into_inner()?)
}

fn header_usize(reader: &Reader<&[u8]>, key: &str) -> ArtifactResult<usize> {
    let raw = reader
        .user_metadata()
        .get(key)
        .ok_or_else(|| ArtifactError::Schema(format!("missing header {}", key)))?;
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| ArtifactError::Schema(format!("header {} is not a count", key)))
}

/// Decode an Avro object container written by `encode_windows`
pub fn decode_windows(bytes: &[u8]) -> ArtifactResult<WindowArtifact> {
    let schema = window_record_v1()?;
    let reader = Reader::with_schema(&schema, bytes)?;

    let window_size = header_usize(&reader, WINDOW_SIZE_KEY)?;
    let channel_count = header_usize(&reader, CHANNEL_COUNT_KEY)?;
    if channel_count != CHANNEL_COUNT {
        return Err(ArtifactError::Schema(format!(
            "artifact has {} channels, expected {}",
            channel_count, CHANNEL_COUNT
        )));
    }

    let mut artifact = WindowArtifact::new(window_size);
    for (index, value) in reader.enumerate() {
        let (label, values) = window_fields(index, value?)?;
        if values.len() != window_size * CHANNEL_COUNT {
            return Err(ArtifactError::Shape {
                index,
                reason: format!(
                    "{} values, expected {} x {}",
                    values.len(),
                    window_size,
                    CHANNEL_COUNT
                ),
            });
        }

        let frames: Vec<Frame> = values
            .chunks_exact(CHANNEL_COUNT)
            .map(|chunk| {
                let mut frame = [0.0; CHANNEL_COUNT];
                frame.copy_from_slice(chunk);
                frame
            })
            .collect();
        artifact.push(frames, label);
    }

    debug!("decoded {} windows of {} rows", artifact.len(), window_size);
    Ok(artifact)
}

fn window_fields(index: usize, value: Value) -> ArtifactResult<(Label, Vec<f64>)> {
    let shape = |reason: String| ArtifactError::Shape { index, reason };

    let Value::Record(fields) = value else {
        return Err(shape("not a record".to_string()));
    };

    let mut label = None;
    let mut values = None;
    for (name, field) in fields {
        match (name.as_str(), field) {
            ("label", Value::Int(code)) => {
                let code = u8::try_from(code).map_err(|_| shape(format!("label {}", code)))?;
                label = Some(Label::try_from(code).map_err(shape)?);
            }
            ("values", Value::Array(items)) => {
                let doubles = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Double(v) => Ok(v),
                        other => Err(shape(format!("non-double value {:?}", other))),
                    })
                    .collect::<ArtifactResult<Vec<f64>>>()?;
                values = Some(doubles);
            }
            _ => {}
        }
    }

    match (label, values) {
        (Some(label), Some(values)) => Ok((label, values)),
        _ => Err(shape("missing label or values".to_string())),
    }
}

/// Write a window artifact to `path`
pub fn save_windows(artifact: &WindowArtifact, path: impl AsRef<Path>) -> ArtifactResult<()> {
    let path = path.as_ref();
    let bytes = encode_windows(artifact)?;
    std::fs::write(path, bytes).map_err(|e| ArtifactError::io(path, e))?;
    debug!("wrote {} windows to {}", artifact.len(), path.display());
    Ok(())
}

/// Read a window artifact from `path`
pub fn load_windows(path: impl AsRef<Path>) -> ArtifactResult<WindowArtifact> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ArtifactError::io(path, e))?;
    decode_windows(&bytes)
}
