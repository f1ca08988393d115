//! Harness defaults from an optional TOML file, merged with command-line flags.
//!
//! ```toml
//! data_root = "~/data/trajectories"
//! batch_size = 64
//! seed = 7
//!
//! [strategies]
//! rejection_oversample = 10
//! smart_min_prior = 0.05
//!
//! [policy]
//! on_load_error = "skip"
//! on_metric_error = "abort"
//! ```

use crate::args::{EvalArgs, FailurePolicy, StrategySelection};
use crate::error::{HarnessError, HarnessResult};
use data_contracts::{Phase, Split};
use inference::{CheckpointId, DeviceChoice, InferenceSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "mggan-eval.toml";
pub const CONFIG_ENV: &str = "MGGAN_EVAL_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub data_root: PathBuf,
    pub batch_size: usize,
    pub seed: u64,
    pub rejection_oversample: usize,
    pub smart_min_prior: f32,
    pub on_load_error: FailurePolicy,
    pub on_metric_error: FailurePolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let inference = InferenceSettings::default();
        Self {
            data_root: PathBuf::from("datasets"),
            batch_size: inference.batch_size,
            seed: inference.seed,
            rejection_oversample: inference.rejection_oversample,
            smart_min_prior: inference.smart_min_prior,
            on_load_error: FailurePolicy::Skip,
            on_metric_error: FailurePolicy::Abort,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct HarnessConfigFile {
    data_root: Option<String>,
    batch_size: Option<usize>,
    seed: Option<u64>,
    strategies: Option<StrategySection>,
    policy: Option<PolicySection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StrategySection {
    rejection_oversample: Option<usize>,
    smart_min_prior: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PolicySection {
    on_load_error: Option<FailurePolicy>,
    on_metric_error: Option<FailurePolicy>,
}

impl HarnessConfig {
    /// `explicit`, then `$MGGAN_EVAL_CONFIG`, then `mggan-eval.toml` in the working directory.
    ///
    /// A named file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> HarnessResult<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(|v| expand_path(&v)));
        let cfg = match named {
            Some(path) => Self::from_path(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_NAME);
                if path.exists() {
                    Self::from_path(path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.warn_if_invalid();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: HarnessConfigFile =
            toml::from_str(&raw).map_err(|e| HarnessError::ConfigFile {
                path: path.to_path_buf(),
                msg: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "loaded harness config");
        Ok(Self::from_file(file))
    }

    fn from_file(file: HarnessConfigFile) -> Self {
        let defaults = Self::default();
        let strategies = file.strategies.unwrap_or_default();
        let policy = file.policy.unwrap_or_default();
        Self {
            data_root: file
                .data_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.data_root),
            batch_size: file.batch_size.unwrap_or(defaults.batch_size),
            seed: file.seed.unwrap_or(defaults.seed),
            rejection_oversample: strategies
                .rejection_oversample
                .unwrap_or(defaults.rejection_oversample),
            smart_min_prior: strategies
                .smart_min_prior
                .unwrap_or(defaults.smart_min_prior),
            on_load_error: policy.on_load_error.unwrap_or(defaults.on_load_error),
            on_metric_error: policy.on_metric_error.unwrap_or(defaults.on_metric_error),
        }
    }

    fn warn_if_invalid(&self) {
        if self.batch_size == 0 {
            tracing::warn!("harness config: batch_size is 0; predictions will run one scenario at a time");
        }
        if self.rejection_oversample < 2 {
            tracing::warn!("harness config: rejection_oversample below 2 leaves nothing to reject");
        }
        if !(0.0..=1.0).contains(&self.smart_min_prior) {
            tracing::warn!(
                value = self.smart_min_prior,
                "harness config: smart_min_prior outside [0, 1]"
            );
        }
        if !self.data_root.exists() {
            tracing::warn!(path = %self.data_root.display(), "harness config: data_root does not exist");
        }
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    if let Some(stripped) = raw.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(format!("{home}{stripped}"));
        }
    }
    PathBuf::from(raw)
}

/// Everything one evaluation run needs, after merging flags over the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model_root: PathBuf,
    pub output_folder: PathBuf,
    pub data_root: PathBuf,
    pub checkpoint: CheckpointId,
    pub phase: Phase,
    pub split: Split,
    pub eval_set: Option<String>,
    pub num_preds: usize,
    pub selection: StrategySelection,
    pub precision_recall: bool,
    pub radius: f64,
    pub device: DeviceChoice,
    pub inference: InferenceSettings,
    pub on_load_error: FailurePolicy,
    pub on_metric_error: FailurePolicy,
}

impl RunOptions {
    pub fn resolve(args: &EvalArgs, file: &HarnessConfig) -> HarnessResult<Self> {
        if args.num_preds < 2 {
            return Err(HarnessError::InvalidArgument(format!(
                "--num_preds must be at least 2 (candidate counts are 1..num_preds), got {}",
                args.num_preds
            )));
        }
        if !args.radius.is_finite() || args.radius <= 0.0 {
            return Err(HarnessError::InvalidArgument(format!(
                "--radius must be a positive number, got {}",
                args.radius
            )));
        }
        let device = args
            .device
            .parse::<DeviceChoice>()
            .map_err(|e| HarnessError::InvalidArgument(e.to_string()))?;
        let checkpoint = args
            .checkpoint
            .parse::<CheckpointId>()
            .unwrap_or_else(|never| match never {});
        Ok(Self {
            model_root: args.model_path.clone(),
            output_folder: args.output_folder.clone(),
            data_root: args.data_root.clone().unwrap_or_else(|| file.data_root.clone()),
            checkpoint,
            phase: args.phase,
            split: args.split,
            eval_set: args.eval_set.clone(),
            num_preds: args.num_preds,
            selection: args.pred_strat,
            precision_recall: !args.no_precision_recall,
            radius: args.radius,
            device,
            inference: InferenceSettings {
                batch_size: args.batch_size.unwrap_or(file.batch_size).max(1),
                seed: args.seed.unwrap_or(file.seed),
                rejection_oversample: file.rejection_oversample.max(1),
                smart_min_prior: file.smart_min_prior,
            },
            on_load_error: args.on_load_error.unwrap_or(file.on_load_error),
            on_metric_error: args.on_metric_error.unwrap_or(file.on_metric_error),
        })
    }

    /// Candidate cutoffs scored for every unit.
    pub fn candidate_counts(&self) -> Vec<usize> {
        (1..self.num_preds).collect()
    }

    /// Candidates generated per scenario.
    pub fn max_candidates(&self) -> usize {
        self.num_preds - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn file_values_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.toml");
        std::fs::write(
            &path,
            "batch_size = 8\nseed = 3\n[strategies]\nsmart_min_prior = 0.1\n[policy]\non_metric_error = \"skip\"\n",
        )
        .unwrap();
        let cfg = HarnessConfig::from_path(&path).unwrap();
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.seed, 3);
        assert_eq!(cfg.smart_min_prior, 0.1);
        assert_eq!(cfg.rejection_oversample, 10);
        assert_eq!(cfg.on_load_error, FailurePolicy::Skip);
        assert_eq!(cfg.on_metric_error, FailurePolicy::Skip);
        assert_eq!(cfg.data_root, PathBuf::from("datasets"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.toml");
        std::fs::write(&path, "batchsize = 8\n").unwrap();
        assert!(matches!(
            HarnessConfig::from_path(&path),
            Err(HarnessError::ConfigFile { .. })
        ));
    }

    #[test]
    fn flags_override_file() {
        let args = EvalArgs::try_parse_from([
            "evaluate",
            "--model_path",
            "runs",
            "--output_folder",
            "out",
            "--phase",
            "val",
            "--checkpoint",
            "40",
            "--seed",
            "9",
            "--on-load-error",
            "abort",
        ])
        .unwrap();
        let file = HarnessConfig {
            seed: 1,
            batch_size: 4,
            ..Default::default()
        };
        let opts = RunOptions::resolve(&args, &file).unwrap();
        assert_eq!(opts.checkpoint, CheckpointId::Epoch(40));
        assert_eq!(opts.inference.seed, 9);
        assert_eq!(opts.inference.batch_size, 4);
        assert_eq!(opts.on_load_error, FailurePolicy::Abort);
        assert_eq!(opts.on_metric_error, FailurePolicy::Abort);
        assert_eq!(opts.candidate_counts(), (1..20).collect::<Vec<_>>());
        assert_eq!(opts.max_candidates(), 19);
        assert_eq!(opts.device, DeviceChoice::Gpu);
    }

    #[test]
    fn tiny_num_preds_is_rejected() {
        let args = EvalArgs::try_parse_from([
            "evaluate",
            "--model_path",
            "runs",
            "--output_folder",
            "out",
            "--phase",
            "test",
            "--num_preds",
            "1",
        ])
        .unwrap();
        assert!(RunOptions::resolve(&args, &HarnessConfig::default()).is_err());
    }
}
