//! Unit-by-unit evaluation: resolve, gate, predict, score, write.

use crate::aggregator::{ResultRow, ResultSchema, UnitDescription};
use crate::args::FailurePolicy;
use crate::config::RunOptions;
use crate::error::{HarnessError, HarnessResult};
use crate::logging::unit_progress;
use crate::planner::{EvaluationPlanner, EvaluationUnit};
use crate::sink::{output_path, ResultSink};
use data_contracts::PredictionSet;
use inference::{
    admits, CheckpointResolver, GateReason, ModelLoader, ResolvedModel, TrajectoryPredictor,
};
use std::path::{Path, PathBuf};
use traj_dataset::{get_dataloader, DatasetError, DatasetRequest, TrajectoryLoader};

/// Where evaluation scenarios come from.
pub trait DatasetSource {
    fn load(&self, request: &DatasetRequest) -> Result<TrajectoryLoader, DatasetError>;
}

/// Datasets read from `<root>/<dataset>/<phase>/*.txt`.
#[derive(Debug, Clone)]
pub struct FsDatasetSource {
    root: PathBuf,
}

impl FsDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetSource for FsDatasetSource {
    fn load(&self, request: &DatasetRequest) -> Result<TrajectoryLoader, DatasetError> {
        get_dataloader(&self.root, request)
    }
}

/// Counts for one finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub output: PathBuf,
    pub planned: usize,
    pub rows: usize,
    pub gated: usize,
    pub fallbacks: usize,
    pub load_failures: usize,
    pub unit_failures: usize,
}

enum UnitOutcome {
    Row(ResultRow),
    Gated(GateReason),
}

pub struct Evaluator<L, S> {
    resolver: CheckpointResolver<L>,
    datasets: S,
    options: RunOptions,
}

impl<L, S> Evaluator<L, S>
where
    L: ModelLoader,
    L::Model: TrajectoryPredictor,
    S: DatasetSource,
{
    pub fn new(loader: L, datasets: S, options: RunOptions) -> Self {
        Self {
            resolver: CheckpointResolver::new(loader),
            datasets,
            options,
        }
    }

    pub fn datasets(&self) -> &S {
        &self.datasets
    }

    pub fn output_path(&self) -> PathBuf {
        let o = &self.options;
        output_path(
            &o.output_folder,
            &o.model_root,
            o.phase,
            &o.checkpoint,
            o.split,
            o.selection,
            o.radius,
        )
    }

    pub fn run(&self) -> HarnessResult<RunReport> {
        let planner = EvaluationPlanner::new(self.options.selection.strategies());
        let units = planner.plan(&self.options.model_root)?;
        let schema = ResultSchema::new(
            &self.options.candidate_counts(),
            self.options.precision_recall,
            self.options.eval_set.is_some(),
        );
        let mut sink = ResultSink::new(self.output_path(), &schema);
        let mut report = RunReport {
            output: sink.path().to_path_buf(),
            planned: units.len(),
            ..Default::default()
        };
        tracing::info!(
            output = %report.output.display(),
            units = units.len(),
            checkpoint = %self.options.checkpoint,
            "starting evaluation"
        );

        let progress = unit_progress(units.len());
        for unit in &units {
            progress.set_message(format!("{} {}", dir_name(&unit.model_dir), unit.strategy));
            match self.evaluate_unit(unit, &schema, &mut report) {
                Ok(UnitOutcome::Row(row)) => {
                    sink.append(row)?;
                    report.rows += 1;
                }
                Ok(UnitOutcome::Gated(reason)) => {
                    tracing::debug!(
                        dir = %unit.model_dir.display(),
                        strategy = %unit.strategy,
                        %reason,
                        "unit skipped"
                    );
                    report.gated += 1;
                }
                Err(err @ HarnessError::Load { .. }) => {
                    report.load_failures += 1;
                    apply_policy(self.options.on_load_error, err)?;
                }
                Err(
                    err @ (HarnessError::Dataset { .. }
                    | HarnessError::Prediction { .. }
                    | HarnessError::Metric { .. }),
                ) => {
                    report.unit_failures += 1;
                    apply_policy(self.options.on_metric_error, err)?;
                }
                Err(err) => {
                    progress.abandon();
                    return Err(err);
                }
            }
            progress.inc(1);
        }
        progress.finish_with_message("done");

        tracing::info!(
            rows = report.rows,
            gated = report.gated,
            fallbacks = report.fallbacks,
            load_failures = report.load_failures,
            unit_failures = report.unit_failures,
            "evaluation finished"
        );
        Ok(report)
    }

    fn evaluate_unit(
        &self,
        unit: &EvaluationUnit,
        schema: &ResultSchema,
        report: &mut RunReport,
    ) -> HarnessResult<UnitOutcome> {
        let dir = &unit.model_dir;
        let ResolvedModel {
            model,
            mut config,
            checkpoint,
            primary_error,
        } = self
            .resolver
            .resolve(dir, &self.options.checkpoint)
            .into_result()
            .map_err(|source| HarnessError::Load {
                dir: dir.clone(),
                source,
            })?;
        if primary_error.is_some() {
            report.fallbacks += 1;
        }

        if let Err(reason) = admits(&config, unit.strategy) {
            return Ok(UnitOutcome::Gated(reason));
        }

        config.augment = 0;
        let training_dataset = self
            .options
            .eval_set
            .as_ref()
            .map(|set| std::mem::replace(&mut config.dataset, set.clone()));
        if !config.is_known_dataset() {
            tracing::debug!(dataset = %config.dataset, "dataset is not one of the published benchmarks");
        }

        let request = DatasetRequest {
            dataset: config.dataset.clone(),
            phase: self.options.phase,
            batch_size: self.options.inference.batch_size,
            split: self.options.split,
            obs_len: config.obs_len,
            pred_len: config.pred_len,
            load_semantic_map: config.load_semantic_map,
        };
        let loader = self
            .datasets
            .load(&request)
            .map_err(|source| HarnessError::Dataset {
                dir: dir.clone(),
                source,
            })?;
        tracing::debug!(
            scenarios = loader.dataset().len(),
            batches = loader.num_batches(),
            batch_size = loader.batch_size(),
            "dataset loaded"
        );

        let mut preds = PredictionSet::new();
        for batch in loader.batches() {
            let batch_preds = model
                .predict(
                    batch,
                    self.options.max_candidates(),
                    unit.strategy,
                    &self.options.inference,
                )
                .map_err(|source| HarnessError::Prediction {
                    dir: dir.clone(),
                    strategy: unit.strategy,
                    source,
                })?;
            preds.extend(batch_preds);
        }
        let dataset = loader.into_dataset();
        let metrics = schema
            .score(dataset.scenarios(), &preds, self.options.radius)
            .map_err(|source| HarnessError::Metric {
                dir: dir.clone(),
                strategy: unit.strategy,
                source,
            })?;

        tracing::info!(
            dir = %dir.display(),
            strategy = %unit.strategy,
            checkpoint = %checkpoint,
            scenarios = dataset.len(),
            "unit scored"
        );
        let description = UnitDescription::new(
            &config,
            training_dataset,
            model.generator_params(),
            unit.strategy,
        );
        Ok(UnitOutcome::Row(schema.build_row(description, &metrics)?))
    }
}

fn apply_policy(policy: FailurePolicy, err: HarnessError) -> HarnessResult<()> {
    match policy {
        FailurePolicy::Abort => Err(err),
        FailurePolicy::Skip => {
            tracing::error!(error = %err, "unit failed; continuing");
            Ok(())
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
