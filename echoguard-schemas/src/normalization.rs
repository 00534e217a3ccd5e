//! Normalization parameter blobs
//!
//! `imputer.json` and `scaler.json` are written side by side. Each loads on
//! its own; loading both rebuilds the frozen `NormalizationState`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use echoguard_core::normalize::NORMALIZATION_VERSION;
use echoguard_core::{ImputerParams, NormalizationState, ScalerParams};

use crate::{ArtifactError, ArtifactResult};

/// File name of the imputation blob
pub const IMPUTER_FILE: &str = "imputer.json";

/// File name of the scaling blob
pub const SCALER_FILE: &str = "scaler.json";

fn write_json<T: Serialize>(value: &T, path: &Path) -> ArtifactResult<()> {
    let file = File::create(path).map_err(|e| ArtifactError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|e| ArtifactError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ArtifactResult<T> {
    let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn check_version(artifact: &'static str, found: u32) -> ArtifactResult<()> {
    if found != NORMALIZATION_VERSION {
        return Err(ArtifactError::Version {
            artifact,
            found,
            expected: NORMALIZATION_VERSION,
        });
    }
    Ok(())
}

/// Write both blobs into `dir`
pub fn save_normalization(state: &NormalizationState, dir: impl AsRef<Path>) -> ArtifactResult<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| ArtifactError::io(dir, e))?;
    write_json(&state.imputer, &dir.join(IMPUTER_FILE))?;
    write_json(&state.scaler, &dir.join(SCALER_FILE))?;
    info!("saved normalization state to {}", dir.display());
    Ok(())
}

/// Load the imputation blob alone
pub fn load_imputer(path: impl AsRef<Path>) -> ArtifactResult<ImputerParams> {
    let params: ImputerParams = read_json(path.as_ref())?;
    check_version(IMPUTER_FILE, params.version)?;
    Ok(params)
}

/// Load the scaling blob alone
pub fn load_scaler(path: impl AsRef<Path>) -> ArtifactResult<ScalerParams> {
    let params: ScalerParams = read_json(path.as_ref())?;
    check_version(SCALER_FILE, params.version)?;
    if let Some(bad) = params.scale.iter().find(|s| !s.is_finite() || **s == 0.0) {
        return Err(ArtifactError::Shape {
            index: 0,
            reason: format!("scale {} must be finite and non-zero", bad),
        });
    }
    Ok(params)
}

/// Load both blobs from `dir`
pub fn load_normalization(dir: impl AsRef<Path>) -> ArtifactResult<NormalizationState> {
    let dir = dir.as_ref();
    let state = NormalizationState {
        imputer: load_imputer(dir.join(IMPUTER_FILE))?,
        scaler: load_scaler(dir.join(SCALER_FILE))?,
    };
    info!("loaded normalization state from {}", dir.display());
    Ok(state)
}
