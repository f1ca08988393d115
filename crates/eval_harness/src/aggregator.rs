//! Result table schema and per-unit rows.
//!
//! The schema is fixed before the first unit runs: descriptive columns, then
//! `ADE@k`/`FDE@k` for every cutoff, then `Precision@k`/`Recall@k` when region
//! metrics are enabled. Rows are checked against it when built.

use data_contracts::{ModelConfig, PredictionSet, Scenario};
use evaluation::{
    evaluate_ade_fde, evaluate_precision_recall, MetricError, MetricKey, MetricKind, MetricMap,
};
use inference::PredictionStrategy;
use std::fmt;
use thiserror::Error;

pub const TRAINING_DATASET_COLUMN: &str = "Training dataset";

pub const DESCRIPTIVE_COLUMNS: [&str; 14] = [
    "Model",
    "# Generators",
    "Decoder dim",
    "Generator params",
    "Prediction strategy",
    "Mode",
    "Use Classifier",
    "Prior",
    "Dataset",
    "Maximization Samples",
    "Expectation Samples",
    "L2 loss weight",
    "Clf loss weight",
    "Sigma",
];

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("metric {0} is declared in the schema but was not computed")]
    MissingMetric(String),
    #[error("metric {0} was computed but is not declared in the schema")]
    UnexpectedMetric(String),
    #[error("training dataset column declared: {declared}, value supplied: {supplied}")]
    TrainingDataset { declared: bool, supplied: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(u64),
    Float(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Int(v as u64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

/// Descriptive values of one admitted unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDescription {
    /// Dataset the model was trained on, when evaluating on another one.
    pub training_dataset: Option<String>,
    pub cells: Vec<Cell>,
}

impl UnitDescription {
    /// `config` is the evaluation-time config, with any dataset override applied.
    pub fn new(
        config: &ModelConfig,
        training_dataset: Option<String>,
        generator_params: usize,
        strategy: PredictionStrategy,
    ) -> Self {
        let cells = vec![
            Cell::Text(config.name.clone()),
            config.num_gens.into(),
            config.decoder_h_dim.into(),
            generator_params.into(),
            strategy.as_str().into(),
            config.experiment.as_str().into(),
            config.gan_type.as_str().into(),
            config.weighting_target.as_str().into(),
            Cell::Text(config.dataset.clone()),
            config.num_samples.into(),
            config.num_expectation_samples.into(),
            config.l2_loss_weight.into(),
            config.clf_loss_weight.into(),
            config.sigma.into(),
        ];
        Self {
            training_dataset,
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    cells: Vec<Cell>,
}

impl ResultRow {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSchema {
    columns: Vec<String>,
    metric_keys: Vec<MetricKey>,
    ks: Vec<usize>,
    precision_recall: bool,
    training_dataset: bool,
}

impl ResultSchema {
    pub fn new(ks: &[usize], precision_recall: bool, training_dataset_column: bool) -> Self {
        let mut kinds = vec![MetricKind::Ade, MetricKind::Fde];
        if precision_recall {
            kinds.extend([MetricKind::Precision, MetricKind::Recall]);
        }
        let metric_keys: Vec<MetricKey> = kinds
            .iter()
            .flat_map(|&kind| ks.iter().map(move |&k| MetricKey::new(kind, k)))
            .collect();

        let mut columns = Vec::new();
        if training_dataset_column {
            columns.push(TRAINING_DATASET_COLUMN.to_string());
        }
        columns.extend(DESCRIPTIVE_COLUMNS.iter().map(|c| c.to_string()));
        columns.extend(metric_keys.iter().map(ToString::to_string));
        Self {
            columns,
            metric_keys,
            ks: ks.to_vec(),
            precision_recall,
            training_dataset: training_dataset_column,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn metric_keys(&self) -> &[MetricKey] {
        &self.metric_keys
    }

    pub fn ks(&self) -> &[usize] {
        &self.ks
    }

    pub fn precision_recall(&self) -> bool {
        self.precision_recall
    }

    /// Score `preds` with every metric the schema declares.
    pub fn score(
        &self,
        scenarios: &[Scenario],
        preds: &PredictionSet,
        radius: f64,
    ) -> Result<MetricMap, MetricError> {
        let mut metrics = evaluate_ade_fde(scenarios, preds, &self.ks)?;
        if self.precision_recall {
            metrics.extend(evaluate_precision_recall(scenarios, preds, radius, &self.ks)?);
        }
        Ok(metrics)
    }

    pub fn build_row(
        &self,
        unit: UnitDescription,
        metrics: &MetricMap,
    ) -> Result<ResultRow, SchemaError> {
        if unit.training_dataset.is_some() != self.training_dataset {
            return Err(SchemaError::TrainingDataset {
                declared: self.training_dataset,
                supplied: unit.training_dataset.is_some(),
            });
        }
        if let Some(extra) = metrics.keys().find(|k| !self.metric_keys.contains(k)) {
            return Err(SchemaError::UnexpectedMetric(extra.to_string()));
        }

        let mut cells = Vec::with_capacity(self.columns.len());
        if let Some(dataset) = unit.training_dataset {
            cells.push(Cell::Text(dataset));
        }
        cells.extend(unit.cells);
        for key in &self.metric_keys {
            let value = metrics
                .get(key)
                .ok_or_else(|| SchemaError::MissingMetric(key.to_string()))?;
            cells.push(Cell::Float(value));
        }
        Ok(ResultRow { cells })
    }
}
