use crate::aggregator::SchemaError;
use crate::sink::SinkError;
use evaluation::MetricError;
use inference::{InferenceError, PredictionStrategy, ResolveError};
use std::path::PathBuf;
use thiserror::Error;
use traj_dataset::DatasetError;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("model root not found: {path}")]
    MissingModelRoot { path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("config file {path}: {msg}")]
    ConfigFile { path: PathBuf, msg: String },
    #[error("failed to load {dir}: {source}")]
    Load {
        dir: PathBuf,
        #[source]
        source: ResolveError,
    },
    #[error("dataset for {dir}: {source}")]
    Dataset {
        dir: PathBuf,
        #[source]
        source: DatasetError,
    },
    #[error("prediction for {dir} ({strategy}): {source}")]
    Prediction {
        dir: PathBuf,
        strategy: PredictionStrategy,
        #[source]
        source: InferenceError,
    },
    #[error("metrics for {dir} ({strategy}): {source}")]
    Metric {
        dir: PathBuf,
        strategy: PredictionStrategy,
        #[source]
        source: MetricError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
