//! Model version directories and checkpoint resolution.
//!
//! A version directory holds the training config and recorded weights:
//!
//! ```text
//! version_3/
//!   config.json
//!   checkpoints/
//!     best.bin
//!     epoch=120.bin
//! ```

use crate::predictor::ModelInstance;
use crate::{InferenceBackend, InferenceDevice};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use data_contracts::{ConfigError, ModelConfig};
use models::{MultiGenerator, MultiGeneratorConfig};
use std::convert::Infallible;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Requested checkpoint: the `best` sentinel, an epoch number, or anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckpointId {
    Best,
    Epoch(u32),
    Other(String),
}

impl CheckpointId {
    /// Weights file for this id, or `None` when the id has no file layout.
    pub fn file_path(&self, model_dir: &Path) -> Option<PathBuf> {
        let name = match self {
            CheckpointId::Best => "best.bin".to_string(),
            CheckpointId::Epoch(epoch) => format!("epoch={epoch}.bin"),
            CheckpointId::Other(_) => return None,
        };
        Some(model_dir.join(CHECKPOINT_DIR).join(name))
    }
}

impl FromStr for CheckpointId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "best" {
            return Ok(CheckpointId::Best);
        }
        Ok(s.parse::<u32>()
            .map(CheckpointId::Epoch)
            .unwrap_or_else(|_| CheckpointId::Other(s.to_string())))
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointId::Best => f.write_str("best"),
            CheckpointId::Epoch(epoch) => write!(f, "{epoch}"),
            CheckpointId::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("config not found: {path}")]
    MissingConfig { path: PathBuf },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("checkpoint id '{id}' is neither 'best' nor an epoch number")]
    UnknownCheckpoint { id: String },
    #[error("checkpoint not found: {path}")]
    MissingCheckpoint { path: PathBuf },
    #[error("failed to read or write weights at {path}: {msg}")]
    Record { path: PathBuf, msg: String },
    #[error("checkpoint {path} does not match its config: expected {expected} parameters, found {found}")]
    Incompatible {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads a model and its training config from a version directory.
pub trait ModelLoader {
    type Model;

    fn load_from_path(
        &self,
        model_dir: &Path,
        checkpoint: &CheckpointId,
    ) -> Result<(Self::Model, ModelConfig), CheckpointError>;
}

/// Loads burn `MultiGenerator` weights onto a fixed device.
#[derive(Debug, Clone)]
pub struct BurnModelLoader {
    device: InferenceDevice,
}

impl BurnModelLoader {
    pub fn new(device: InferenceDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &InferenceDevice {
        &self.device
    }
}

impl ModelLoader for BurnModelLoader {
    type Model = ModelInstance;

    fn load_from_path(
        &self,
        model_dir: &Path,
        checkpoint: &CheckpointId,
    ) -> Result<(ModelInstance, ModelConfig), CheckpointError> {
        let config_path = model_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(CheckpointError::MissingConfig { path: config_path });
        }
        let config = ModelConfig::from_path(&config_path)?;

        let weights = checkpoint
            .file_path(model_dir)
            .ok_or_else(|| CheckpointError::UnknownCheckpoint {
                id: checkpoint.to_string(),
            })?;
        if !weights.exists() {
            return Err(CheckpointError::MissingCheckpoint { path: weights });
        }

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let fresh =
            MultiGenerator::<InferenceBackend>::new(&MultiGeneratorConfig::from(&config), &self.device);
        let expected = fresh.num_params();
        let model = fresh
            .load_file(weights.clone(), &recorder, &self.device)
            .map_err(|e| CheckpointError::Record {
                path: weights.clone(),
                msg: format!("{e:?}"),
            })?;
        let found = model.num_params();
        if found != expected {
            return Err(CheckpointError::Incompatible {
                path: weights,
                expected,
                found,
            });
        }

        tracing::debug!(
            dir = %model_dir.display(),
            checkpoint = %checkpoint,
            generators = model.num_generators(),
            "loaded checkpoint"
        );
        Ok((
            ModelInstance::new(model, self.device.clone(), checkpoint.clone()),
            config,
        ))
    }
}

/// Record `model` under `id` inside `model_dir/checkpoints/`.
pub fn save_checkpoint<B: Backend>(
    model: &MultiGenerator<B>,
    model_dir: &Path,
    id: &CheckpointId,
) -> Result<PathBuf, CheckpointError> {
    let path = id
        .file_path(model_dir)
        .ok_or_else(|| CheckpointError::UnknownCheckpoint { id: id.to_string() })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.clone(), &recorder)
        .map_err(|e| CheckpointError::Record {
            path: path.clone(),
            msg: format!("{e:?}"),
        })?;
    Ok(path)
}

/// Create a version directory with `config` and freshly initialised `best` weights.
pub fn init_version_dir(
    model_dir: &Path,
    config: &ModelConfig,
    device: &InferenceDevice,
) -> Result<MultiGenerator<InferenceBackend>, CheckpointError> {
    config.validate().map_err(|source| ConfigError::Invalid {
        path: model_dir.join(CONFIG_FILE),
        source,
    })?;
    fs::create_dir_all(model_dir).map_err(|source| CheckpointError::Io {
        path: model_dir.to_path_buf(),
        source,
    })?;
    config.write_to(&model_dir.join(CONFIG_FILE))?;
    let model = MultiGenerator::<InferenceBackend>::new(&MultiGeneratorConfig::from(config), device);
    save_checkpoint(&model, model_dir, &CheckpointId::Best)?;
    Ok(model)
}

/// Successfully resolved model plus the checkpoint that actually loaded.
#[derive(Debug)]
pub struct ResolvedModel<M> {
    pub model: M,
    pub config: ModelConfig,
    pub checkpoint: CheckpointId,
    /// Set when the requested checkpoint failed and the fallback was used.
    pub primary_error: Option<CheckpointError>,
}

/// Outcome of the two-step resolution policy.
#[derive(Debug)]
pub enum CheckpointResolution<M> {
    Primary {
        model: M,
        config: ModelConfig,
        checkpoint: CheckpointId,
    },
    Fallback {
        model: M,
        config: ModelConfig,
        checkpoint: CheckpointId,
        requested: CheckpointId,
        primary_error: CheckpointError,
    },
    Failed {
        requested: CheckpointId,
        primary_error: CheckpointError,
        /// `None` when the requested id already was the fallback id.
        fallback_error: Option<CheckpointError>,
    },
}

impl<M> CheckpointResolution<M> {
    pub fn used_fallback(&self) -> bool {
        matches!(self, CheckpointResolution::Fallback { .. })
    }

    pub fn into_result(self) -> Result<ResolvedModel<M>, ResolveError> {
        match self {
            CheckpointResolution::Primary {
                model,
                config,
                checkpoint,
            } => Ok(ResolvedModel {
                model,
                config,
                checkpoint,
                primary_error: None,
            }),
            CheckpointResolution::Fallback {
                model,
                config,
                checkpoint,
                primary_error,
                ..
            } => Ok(ResolvedModel {
                model,
                config,
                checkpoint,
                primary_error: Some(primary_error),
            }),
            CheckpointResolution::Failed {
                requested,
                primary_error,
                fallback_error,
            } => Err(ResolveError {
                requested,
                primary: primary_error,
                fallback: fallback_error,
            }),
        }
    }
}

/// Both the requested and the fallback checkpoint failed to load.
#[derive(Debug)]
pub struct ResolveError {
    pub requested: CheckpointId,
    pub primary: CheckpointError,
    pub fallback: Option<CheckpointError>,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "checkpoint '{}' failed: {}", self.requested, self.primary)?;
        if let Some(fallback) = &self.fallback {
            write!(f, "; fallback failed: {fallback}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.fallback.as_ref().unwrap_or(&self.primary))
    }
}

/// Requested checkpoint first, then a single retry with the fallback id.
#[derive(Debug, Clone)]
pub struct CheckpointResolver<L> {
    loader: L,
    fallback: CheckpointId,
}

impl<L: ModelLoader> CheckpointResolver<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            fallback: CheckpointId::Best,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn resolve(&self, model_dir: &Path, requested: &CheckpointId) -> CheckpointResolution<L::Model> {
        let primary_error = match self.loader.load_from_path(model_dir, requested) {
            Ok((model, config)) => {
                return CheckpointResolution::Primary {
                    model,
                    config,
                    checkpoint: requested.clone(),
                }
            }
            Err(err) => err,
        };

        if *requested == self.fallback {
            return CheckpointResolution::Failed {
                requested: requested.clone(),
                primary_error,
                fallback_error: None,
            };
        }

        tracing::warn!(
            dir = %model_dir.display(),
            checkpoint = %requested,
            fallback = %self.fallback,
            error = %primary_error,
            "checkpoint load failed; retrying with fallback"
        );
        match self.loader.load_from_path(model_dir, &self.fallback) {
            Ok((model, config)) => CheckpointResolution::Fallback {
                model,
                config,
                checkpoint: self.fallback.clone(),
                requested: requested.clone(),
                primary_error,
            },
            Err(fallback_error) => CheckpointResolution::Failed {
                requested: requested.clone(),
                primary_error,
                fallback_error: Some(fallback_error),
            },
        }
    }
}
