//! Model Registry with Guarded Lazy Loading
//!
//! ## Overview
//!
//! Predictor handles are expensive to build (parameter files, runtimes) and
//! cheap to call. The registry is an explicit object constructed once by the
//! caller and passed by reference to every scorer:
//!
//! ```text
//!   thread A ─┐
//!   thread B ─┼─► registry.sequence() ─► OnceLock ─► loader.load_sequence()  (once)
//!   thread C ─┘                             │
//!                                           └─► Arc<dyn SequencePredictor>  (shared)
//! ```
//!
//! Each handle sits behind its own `OnceLock`. Concurrent first calls block
//! until the single load finishes, then all of them observe the same result.
//! A failed load is cached too: the registry warns once and reports the model
//! as unavailable from then on, without retrying on every request.

use std::fmt;
use std::sync::{Arc, OnceLock};

use log::{info, warn};
use thiserror::Error;

use crate::predictor::{Reconstructor, SequencePredictor, TabularPredictor};

/// The three external models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Sequence classifier
    Sequence,
    /// Tabular classifier
    Tabular,
    /// Reconstruction autoencoder
    Reconstructor,
}

impl ModelKind {
    /// Short name used in logs and response annotations
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Sequence => "sequence",
            ModelKind::Tabular => "tabular",
            ModelKind::Reconstructor => "reconstructor",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A predictor could not be loaded
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{model} model unavailable: {reason}")]
pub struct ModelUnavailableError {
    /// Which model
    pub model: ModelKind,
    /// Why loading failed
    pub reason: String,
}

impl ModelUnavailableError {
    /// Error for `model` with a reason
    pub fn new(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            model,
            reason: reason.into(),
        }
    }
}

/// Result of one load attempt
pub type LoadResult<T> = Result<Arc<T>, ModelUnavailableError>;

/// Builds predictor handles on first use
pub trait ModelLoader: Send + Sync {
    /// Build the sequence classifier
    fn load_sequence(&self) -> LoadResult<dyn SequencePredictor>;

    /// Build the tabular classifier
    fn load_tabular(&self) -> LoadResult<dyn TabularPredictor>;

    /// Build the reconstruction autoencoder
    fn load_reconstructor(&self) -> LoadResult<dyn Reconstructor>;
}

/// Loader over predictors that already exist in memory
#[derive(Clone, Default)]
pub struct StaticModels {
    sequence: Option<Arc<dyn SequencePredictor>>,
    tabular: Option<Arc<dyn TabularPredictor>>,
    reconstructor: Option<Arc<dyn Reconstructor>>,
}

impl StaticModels {
    /// Loader with no models; every load reports unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the sequence classifier
    pub fn with_sequence(mut self, model: impl SequencePredictor + 'static) -> Self {
        self.sequence = Some(Arc::new(model));
        self
    }

    /// Provide the tabular classifier
    pub fn with_tabular(mut self, model: impl TabularPredictor + 'static) -> Self {
        self.tabular = Some(Arc::new(model));
        self
    }

    /// Provide the reconstruction autoencoder
    pub fn with_reconstructor(mut self, model: impl Reconstructor + 'static) -> Self {
        self.reconstructor = Some(Arc::new(model));
        self
    }
}

fn provided<T: ?Sized>(handle: &Option<Arc<T>>, model: ModelKind) -> LoadResult<T> {
    handle
        .clone()
        .ok_or_else(|| ModelUnavailableError::new(model, "no model provided"))
}

impl ModelLoader for StaticModels {
    fn load_sequence(&self) -> LoadResult<dyn SequencePredictor> {
        provided(&self.sequence, ModelKind::Sequence)
    }

    fn load_tabular(&self) -> LoadResult<dyn TabularPredictor> {
        provided(&self.tabular, ModelKind::Tabular)
    }

    fn load_reconstructor(&self) -> LoadResult<dyn Reconstructor> {
        provided(&self.reconstructor, ModelKind::Reconstructor)
    }
}

/// Availability of one model after its first access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    /// Not requested yet
    NotLoaded,
    /// Loaded and ready
    Ready,
    /// Load failed; cached
    Unavailable,
}

/// Shared, lazily-populated predictor handles
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    sequence: OnceLock<LoadResult<dyn SequencePredictor>>,
    tabular: OnceLock<LoadResult<dyn TabularPredictor>>,
    reconstructor: OnceLock<LoadResult<dyn Reconstructor>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("sequence", &self.status(ModelKind::Sequence))
            .field("tabular", &self.status(ModelKind::Tabular))
            .field("reconstructor", &self.status(ModelKind::Reconstructor))
            .finish()
    }
}

fn settle<T: ?Sized>(model: ModelKind, result: LoadResult<T>) -> LoadResult<T> {
    match &result {
        Ok(_) => info!("{} model loaded", model),
        Err(e) => warn!("{}; scoring will use the neutral default", e),
    }
    result
}

fn status_of<T: ?Sized>(cell: &OnceLock<LoadResult<T>>) -> ModelStatus {
    match cell.get() {
        None => ModelStatus::NotLoaded,
        Some(Ok(_)) => ModelStatus::Ready,
        Some(Err(_)) => ModelStatus::Unavailable,
    }
}

impl ModelRegistry {
    /// Registry that loads through `loader` on first use
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            sequence: OnceLock::new(),
            tabular: OnceLock::new(),
            reconstructor: OnceLock::new(),
        }
    }

    /// Sequence classifier handle, loading it if needed
    pub fn sequence(&self) -> LoadResult<dyn SequencePredictor> {
        self.sequence
            .get_or_init(|| settle(ModelKind::Sequence, self.loader.load_sequence()))
            .clone()
    }

    /// Tabular classifier handle, loading it if needed
    pub fn tabular(&self) -> LoadResult<dyn TabularPredictor> {
        self.tabular
            .get_or_init(|| settle(ModelKind::Tabular, self.loader.load_tabular()))
            .clone()
    }

    /// Reconstruction autoencoder handle, loading it if needed
    pub fn reconstructor(&self) -> LoadResult<dyn Reconstructor> {
        self.reconstructor
            .get_or_init(|| settle(ModelKind::Reconstructor, self.loader.load_reconstructor()))
            .clone()
    }

    /// Load all three now instead of on the first request.
    ///
    /// Returns the models that could not be loaded.
    pub fn preload(&self) -> Vec<ModelUnavailableError> {
        [
            self.sequence().err(),
            self.tabular().err(),
            self.reconstructor().err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Availability without triggering a load
    pub fn status(&self, model: ModelKind) -> ModelStatus {
        match model {
            ModelKind::Sequence => status_of(&self.sequence),
            ModelKind::Tabular => status_of(&self.tabular),
            ModelKind::Reconstructor => status_of(&self.reconstructor),
        }
    }
}
