//! Core types and error definitions for traj_dataset.

use data_contracts::{Phase, Scenario, Split};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset directory not found: {path}")]
    MissingDirectory { path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error at {path}:{line}: {msg}")]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    #[error("invalid dataset request: {0}")]
    InvalidRequest(String),
}

/// What to load: dataset name, phase, split and window geometry.
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub dataset: String,
    pub phase: Phase,
    pub batch_size: usize,
    pub split: Split,
    pub obs_len: usize,
    pub pred_len: usize,
    pub load_semantic_map: bool,
}

impl DatasetRequest {
    pub fn new(dataset: impl Into<String>, phase: Phase) -> Self {
        Self {
            dataset: dataset.into(),
            phase,
            batch_size: 32,
            split: Split::All,
            obs_len: 8,
            pred_len: 12,
            load_semantic_map: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryDataset {
    name: String,
    scenarios: Vec<Scenario>,
}

impl TrajectoryDataset {
    /// Scenario ids are expected to be dense and match their position.
    pub fn new(name: impl Into<String>, scenarios: Vec<Scenario>) -> Self {
        Self {
            name: name.into(),
            scenarios,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Fixed-size batches over a dataset, in scenario order.
#[derive(Debug, Clone)]
pub struct TrajectoryLoader {
    dataset: TrajectoryDataset,
    batch_size: usize,
}

impl TrajectoryLoader {
    pub fn new(dataset: TrajectoryDataset, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dataset(&self) -> &TrajectoryDataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> TrajectoryDataset {
        self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batches(&self) -> std::slice::Chunks<'_, Scenario> {
        self.dataset.scenarios.chunks(self.batch_size)
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }
}
