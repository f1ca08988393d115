//! Evaluation orchestration for multi-generator trajectory models.
//!
//! Plans (model directory, strategy) units, resolves checkpoints with a
//! fallback to `best`, gates units on the model config, scores predictions and
//! rewrites a CSV table after every admitted unit.

pub mod aggregator;
pub mod args;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod planner;
pub mod sink;

pub use aggregator::{Cell, ResultRow, ResultSchema, SchemaError, UnitDescription};
pub use args::{EvalArgs, FailurePolicy, StrategySelection};
pub use config::{HarnessConfig, RunOptions};
pub use error::{HarnessError, HarnessResult};
pub use pipeline::{DatasetSource, Evaluator, FsDatasetSource, RunReport};
pub use planner::{discover_model_dirs, EvaluationPlanner, EvaluationUnit};
pub use sink::{output_path, ResultSink, SinkError};
