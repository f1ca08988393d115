//! Training-time hyperparameters persisted next to every trained model.
//!
//! `ModelConfig` mirrors the knobs used when a model version was trained. It is
//! read back during evaluation (dataset, generator count, weighting target and
//! friends decide how a model is scored) and can be expanded over the declared
//! option lists for grid-search style experiments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Datasets the training pipeline knows how to load.
pub const KNOWN_DATASETS: &[&str] = &[
    "hotel",
    "eth",
    "zara1",
    "zara2",
    "univ",
    "motsynth",
    "social_stanford_synthetic",
    "stanford",
    "gofp",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Rel,
    Abs,
    AbsRel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GanType {
    Probgan,
    Mgan,
    Infogan,
    Gan,
}

impl GanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GanType::Probgan => "probgan",
            GanType::Mgan => "mgan",
            GanType::Infogan => "infogan",
            GanType::Gan => "gan",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Experiment {
    MultiGenerator,
    Discrete,
}

impl Experiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Experiment::MultiGenerator => "multi_generator",
            Experiment::Discrete => "discrete",
        }
    }
}

/// Target the generator prior network was trained to match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightingTarget {
    L2,
    DiscScores,
    Endpoint,
    Mgan,
    Ml,
    None,
}

impl WeightingTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingTarget::L2 => "l2",
            WeightingTarget::DiscScores => "disc_scores",
            WeightingTarget::Endpoint => "endpoint",
            WeightingTarget::Mgan => "mgan",
            WeightingTarget::Ml => "ml",
            WeightingTarget::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum L2LossType {
    None,
    MinZ,
    MinGZ,
    MinGMinZ,
    Mse,
}

/// Adversarial objective: non-saturating, min-max, least-squares or Wasserstein.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GanObjective {
    Ns,
    Mm,
    Ls,
    W,
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(GanType, Experiment, WeightingTarget);

/// Hyperparameters of one trained model version.
///
/// Unknown keys are ignored and missing keys take the training defaults, so
/// configs written by older training runs still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub log_dir: String,
    pub dataset: String,
    pub gpus: String,
    pub workers: usize,
    pub batch_size: usize,
    pub beta1: f64,
    pub load_semantic_map: bool,
    pub l2_loss_weight: f64,
    pub clf_loss_weight: f64,
    pub pi_net_loss_weight: f64,
    pub epochs: usize,
    pub clipping_threshold_d: i64,
    pub clipping_threshold_g: i64,
    pub num_gen_steps: usize,
    pub inp_format: InputFormat,
    pub keep_gen_steps: usize,
    pub top_k_test: usize,
    pub val_every: usize,
    pub save_every: usize,
    pub num_unrolling_steps: usize,
    pub debug: bool,
    pub n_social_modules: usize,
    pub g_lr: f64,
    pub d_lr: f64,
    pub sigma: f64,
    pub gan_type: GanType,
    pub experiment: Experiment,
    pub pool_type: String,
    pub global_disc: i64,
    pub unconditional: bool,
    pub augment: i64,
    pub noise_dim: usize,
    pub h_dim: usize,
    pub grid_size: usize,
    pub decoder_h_dim: usize,
    pub num_samples: usize,
    pub num_expectation_samples: usize,
    pub pred_len: usize,
    pub obs_len: usize,
    pub weighting_target: WeightingTarget,
    pub l2_loss_type: L2LossType,
    pub num_gens: usize,
    pub l2_decay_rate: f64,
    pub checkpoint: Option<String>,
    pub sghmc_alpha: f64,
    pub g_noise_loss_lambda: f64,
    pub d_noise_loss_lambda: f64,
    pub d_hist_loss_lambda: f64,
    pub gan_obj: GanObjective,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            log_dir: "../logs/".to_string(),
            dataset: "stanford_synthetic".to_string(),
            gpus: "0".to_string(),
            workers: 0,
            batch_size: 8,
            beta1: 0.5,
            load_semantic_map: false,
            l2_loss_weight: 1.0,
            clf_loss_weight: 1.0,
            pi_net_loss_weight: 1.0,
            epochs: 500,
            clipping_threshold_d: 100,
            clipping_threshold_g: 500,
            num_gen_steps: 1,
            inp_format: InputFormat::Rel,
            keep_gen_steps: 0,
            top_k_test: 10,
            val_every: 1,
            save_every: 5,
            num_unrolling_steps: 0,
            debug: false,
            n_social_modules: 1,
            g_lr: 1e-3,
            d_lr: 1e-3,
            sigma: 1.0,
            gan_type: GanType::Mgan,
            experiment: Experiment::MultiGenerator,
            pool_type: "sways".to_string(),
            global_disc: 1,
            unconditional: false,
            augment: 1,
            noise_dim: 8,
            h_dim: 32,
            grid_size: 16,
            decoder_h_dim: 32,
            num_samples: 10,
            num_expectation_samples: 1,
            pred_len: 12,
            obs_len: 8,
            weighting_target: WeightingTarget::Ml,
            l2_loss_type: L2LossType::MinGZ,
            num_gens: 1,
            l2_decay_rate: 1.0,
            checkpoint: None,
            sghmc_alpha: 0.01,
            g_noise_loss_lambda: 3e-2,
            d_noise_loss_lambda: 3e-2,
            d_hist_loss_lambda: 1.0,
            gan_obj: GanObjective::Ns,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("num_gens must be at least 1")]
    NoGenerators,
    #[error("{field} must be greater than zero")]
    ZeroSize { field: &'static str },
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidWeight { field: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("cannot apply option {key}={value}: {source}")]
    Option {
        key: &'static str,
        value: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.num_gens == 0 {
            return Err(ValidationError::NoGenerators);
        }
        let sizes = [
            ("obs_len", self.obs_len),
            ("pred_len", self.pred_len),
            ("noise_dim", self.noise_dim),
            ("h_dim", self.h_dim),
            ("decoder_h_dim", self.decoder_h_dim),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(ValidationError::ZeroSize { field });
            }
        }
        let weights = [
            ("l2_loss_weight", self.l2_loss_weight),
            ("clf_loss_weight", self.clf_loss_weight),
            ("pi_net_loss_weight", self.pi_net_loss_weight),
            ("sigma", self.sigma),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidWeight { field, value });
            }
        }
        Ok(())
    }

    /// Read and validate a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ModelConfig = serde_json::from_slice(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(cfg)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_known_dataset(&self) -> bool {
        KNOWN_DATASETS.contains(&self.dataset.as_str())
    }

    /// Expand this config over the declared option lists.
    ///
    /// Only tunable lists are varied unless `include_untunable` is set; the
    /// remaining knobs keep the values of `self`. Combinations are produced in
    /// declaration order with the last list varying fastest.
    pub fn grid(&self, include_untunable: bool) -> Result<Vec<ModelConfig>, ConfigError> {
        let lists: Vec<&OptList> = OPT_LISTS
            .iter()
            .filter(|opt| opt.tunable || include_untunable)
            .collect();

        let mut combos: Vec<Vec<(&'static str, &OptValue)>> = vec![Vec::new()];
        for list in &lists {
            let mut next = Vec::with_capacity(combos.len() * list.options.len());
            for combo in &combos {
                for option in list.options {
                    let mut extended = combo.clone();
                    extended.push((list.key, option));
                    next.push(extended);
                }
            }
            combos = next;
        }

        combos
            .into_iter()
            .map(|combo| self.with_options(&combo))
            .collect()
    }

    fn with_options(&self, options: &[(&'static str, &OptValue)]) -> Result<ModelConfig, ConfigError> {
        let mut value = serde_json::to_value(self).map_err(|source| ConfigError::Option {
            key: "<config>",
            value: String::new(),
            source,
        })?;
        for (key, option) in options {
            value[*key] = option.to_json();
        }
        serde_json::from_value(value).map_err(|source| {
            let (key, option) = options.last().copied().unwrap_or(("<none>", &OptValue::Int(0)));
            ConfigError::Option {
                key,
                value: option.to_string(),
                source,
            }
        })
    }
}

/// A single option value of a grid-search list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptValue {
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl OptValue {
    fn to_json(self) -> Value {
        match self {
            OptValue::Int(v) => Value::from(v),
            OptValue::Float(v) => Value::from(v),
            OptValue::Str(v) => Value::from(v),
        }
    }
}

impl fmt::Display for OptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptValue::Int(v) => write!(f, "{v}"),
            OptValue::Float(v) => write!(f, "{v}"),
            OptValue::Str(v) => f.write_str(v),
        }
    }
}

/// Option list attached to a knob; `tunable` lists take part in the default grid.
#[derive(Debug)]
pub struct OptList {
    pub key: &'static str,
    pub options: &'static [OptValue],
    pub tunable: bool,
}

pub const OPT_LISTS: &[OptList] = &[
    OptList {
        key: "beta1",
        options: &[OptValue::Float(0.1), OptValue::Float(0.5), OptValue::Float(0.9)],
        tunable: false,
    },
    OptList {
        key: "l2_loss_type",
        options: &[
            OptValue::Str("none"),
            OptValue::Str("min_z"),
            OptValue::Str("min_g_z"),
            OptValue::Str("min_g_min_z"),
            OptValue::Str("mse"),
        ],
        tunable: false,
    },
    OptList {
        key: "num_gens",
        options: &[OptValue::Int(2), OptValue::Int(3), OptValue::Int(4), OptValue::Int(5)],
        tunable: true,
    },
    OptList {
        key: "l2_decay_rate",
        options: &[OptValue::Float(1.0), OptValue::Float(0.99), OptValue::Float(0.9)],
        tunable: false,
    },
    OptList {
        key: "sghmc_alpha",
        options: &[OptValue::Float(0.1), OptValue::Float(0.01), OptValue::Float(0.001)],
        tunable: false,
    },
    OptList {
        key: "gan_obj",
        options: &[
            OptValue::Str("NS"),
            OptValue::Str("MM"),
            OptValue::Str("LS"),
            OptValue::Str("W"),
        ],
        tunable: false,
    },
];
