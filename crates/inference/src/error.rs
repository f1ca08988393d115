use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("unknown device '{0}' (expected cpu, cuda[:N], gpu or wgpu)")]
    UnknownDevice(String),
    #[error("max_candidates must be at least 1, got {0}")]
    InvalidCandidateCount(usize),
    #[error("scenario {scenario} has {found} observed steps, model expects {expected}")]
    HistoryLength {
        scenario: usize,
        expected: usize,
        found: usize,
    },
    #[error("generator {0} does not exist")]
    MissingGenerator(usize),
    #[error("tensor conversion failed: {0}")]
    Tensor(String),
}
