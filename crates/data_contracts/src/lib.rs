//! Shared data contracts for model versions, trajectory scenarios and predictions.

pub mod hparams;
pub mod trajectory;

pub use hparams::{
    ConfigError, Experiment, GanObjective, GanType, InputFormat, L2LossType, ModelConfig, OptList,
    OptValue, ValidationError, WeightingTarget, KNOWN_DATASETS, OPT_LISTS,
};
pub use trajectory::{
    distance, ParseEnumError, Phase, Point, PredictionSet, Scenario, ScenarioId, Split, Trajectory,
};
