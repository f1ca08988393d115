//! Trajectory dataset loading for evaluation.
//!
//! Datasets live under `<root>/<dataset>/<phase>/` as whitespace-separated
//! text files with one `frame agent x y` record per line (the ETH/UCY layout).
//! Files are windowed into scenarios of `obs_len + pred_len` consecutive
//! frames, keeping every agent present in all frames of a window.

pub mod types;
pub mod windowing;

pub use types::{DatasetError, DatasetRequest, DatasetResult, TrajectoryDataset, TrajectoryLoader};
pub use windowing::{parse_records, window_scenarios, Record};

use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the files of one dataset phase.
pub fn phase_dir(root: &Path, request: &DatasetRequest) -> PathBuf {
    root.join(&request.dataset).join(request.phase.as_str())
}

/// Load, window and split-filter a dataset phase, returning a batching loader.
pub fn get_dataloader(root: &Path, request: &DatasetRequest) -> DatasetResult<TrajectoryLoader> {
    if request.obs_len == 0 || request.pred_len == 0 {
        return Err(DatasetError::InvalidRequest(format!(
            "obs_len ({}) and pred_len ({}) must be positive",
            request.obs_len, request.pred_len
        )));
    }
    if request.load_semantic_map {
        tracing::warn!(
            dataset = %request.dataset,
            "semantic maps are not consumed by trajectory evaluation; ignoring load_semantic_map"
        );
    }

    let dir = phase_dir(root, request);
    if !dir.is_dir() {
        return Err(DatasetError::MissingDirectory { path: dir });
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map_err(|source| DatasetError::Io {
            path: dir.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    files.sort();

    let seq_len = request.obs_len + request.pred_len;
    let mut scenarios = Vec::new();
    for path in &files {
        let raw = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        let records = parse_records(&raw).map_err(|(line, msg)| DatasetError::Parse {
            path: path.clone(),
            line,
            msg,
        })?;
        let windows = window_scenarios(&records, request.obs_len, seq_len);
        tracing::debug!(file = %path.display(), scenarios = windows.len(), "windowed trajectory file");
        scenarios.extend(windows);
    }

    let total = scenarios.len();
    scenarios.retain(|s| request.split.admits(s));
    for (idx, scenario) in scenarios.iter_mut().enumerate() {
        scenario.id = idx;
    }
    tracing::info!(
        dataset = %request.dataset,
        phase = %request.phase,
        split = %request.split,
        files = files.len(),
        scenarios = scenarios.len(),
        filtered = total - scenarios.len(),
        "loaded evaluation dataset"
    );

    Ok(TrajectoryLoader::new(
        TrajectoryDataset::new(request.dataset.clone(), scenarios),
        request.batch_size,
    ))
}
