use clap::{Parser, ValueEnum};
use data_contracts::{Phase, Split};
use inference::{PredictionStrategy, DEFAULT_STRATEGIES};
use serde::Deserialize;
use std::path::PathBuf;

/// Which prediction strategies to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum StrategySelection {
    /// smart_expected, expected and sampling, in that order.
    All,
    Sampling,
    Expected,
    SmartExpected,
    Rejection,
}

impl StrategySelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategySelection::All => "all",
            StrategySelection::Sampling => "sampling",
            StrategySelection::Expected => "expected",
            StrategySelection::SmartExpected => "smart_expected",
            StrategySelection::Rejection => "rejection",
        }
    }

    pub fn strategies(&self) -> Vec<PredictionStrategy> {
        match self {
            StrategySelection::All => DEFAULT_STRATEGIES.to_vec(),
            StrategySelection::Sampling => vec![PredictionStrategy::Sampling],
            StrategySelection::Expected => vec![PredictionStrategy::Expected],
            StrategySelection::SmartExpected => vec![PredictionStrategy::SmartExpected],
            StrategySelection::Rejection => vec![PredictionStrategy::Rejection],
        }
    }
}

/// What to do when a unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run; rows already written stay on disk.
    Abort,
    /// Log the failure and continue with the next unit.
    Skip,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "evaluate",
    about = "Evaluate MG-GAN checkpoints under several prediction strategies (ADE/FDE, precision/recall)"
)]
pub struct EvalArgs {
    /// Only relevant for intersection datasets: evaluate on the upper or lower branch.
    #[arg(long, value_enum, default_value_t = Split::All)]
    pub split: Split,
    /// Compute device (cpu, cuda, cuda:N, gpu, wgpu).
    #[arg(long, default_value = "cuda")]
    pub device: String,
    /// Radius for the precision and recall metrics.
    #[arg(long, default_value_t = 3.0)]
    pub radius: f64,
    /// Folder holding the `version_*` directories of the models to evaluate.
    #[arg(long = "model_path")]
    pub model_path: PathBuf,
    #[arg(long = "output_folder")]
    pub output_folder: PathBuf,
    /// Epoch number or `best`.
    #[arg(long, default_value = "best")]
    pub checkpoint: String,
    #[arg(long, value_enum)]
    pub phase: Phase,
    /// Evaluate on this dataset instead of the one each model was trained on.
    #[arg(long = "eval_set")]
    pub eval_set: Option<String>,
    /// Candidate counts 1..num_preds are scored.
    #[arg(long = "num_preds", default_value_t = 20)]
    pub num_preds: usize,
    #[arg(long = "pred_strat", value_enum, default_value_t = StrategySelection::All)]
    pub pred_strat: StrategySelection,
    #[arg(long = "no-precision-recall")]
    pub no_precision_recall: bool,
    /// Root of the trajectory datasets (defaults to the config file, then `datasets`).
    #[arg(long = "data_root")]
    pub data_root: Option<PathBuf>,
    #[arg(long = "batch_size")]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Policy when a model directory cannot be loaded (default skip).
    #[arg(long = "on-load-error", value_enum)]
    pub on_load_error: Option<FailurePolicy>,
    /// Policy when dataset loading, prediction or scoring fails (default abort).
    #[arg(long = "on-metric-error", value_enum)]
    pub on_metric_error: Option<FailurePolicy>,
    /// TOML file with harness defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
}
