use crate::checkpoint::CheckpointId;
use crate::selection::{confident_weights, diverse_subset, expected_allocation, integrate, stream_seed};
use crate::strategy::PredictionStrategy;
use crate::{InferenceBackend, InferenceDevice, InferenceError};
use burn::tensor::{Tensor, TensorData};
use data_contracts::{PredictionSet, Scenario, Trajectory};
use models::MultiGenerator;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Knobs of a prediction run, passed explicitly into every call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    /// Scenarios per forward pass.
    pub batch_size: usize,
    /// Base seed for noise and generator draws.
    pub seed: u64,
    /// Pool size multiplier for rejection sampling.
    pub rejection_oversample: usize,
    /// Minimum prior mass for a generator to take part in smart_expected.
    pub smart_min_prior: f32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            batch_size: 32,
            seed: 0,
            rejection_oversample: 10,
            smart_min_prior: 0.05,
        }
    }
}

/// Produces candidate futures for scenarios.
pub trait TrajectoryPredictor {
    /// Trainable parameters of the generators, reported in results.
    fn generator_params(&self) -> usize;

    /// Exactly `max_candidates` trajectories per scenario, keyed by scenario id.
    fn predict(
        &self,
        scenarios: &[Scenario],
        max_candidates: usize,
        strategy: PredictionStrategy,
        settings: &InferenceSettings,
    ) -> Result<PredictionSet, InferenceError>;
}

/// A loaded model ready for inference.
#[derive(Debug)]
pub struct ModelInstance {
    model: MultiGenerator<InferenceBackend>,
    device: InferenceDevice,
    checkpoint: CheckpointId,
}

/// One candidate to generate: which generator and with which noise.
#[derive(Debug, Clone)]
struct Draw {
    generator: usize,
    noise: Vec<f32>,
}

impl ModelInstance {
    pub fn new(
        model: MultiGenerator<InferenceBackend>,
        device: InferenceDevice,
        checkpoint: CheckpointId,
    ) -> Self {
        Self {
            model,
            device,
            checkpoint,
        }
    }

    pub fn checkpoint(&self) -> &CheckpointId {
        &self.checkpoint
    }

    pub fn num_generators(&self) -> usize {
        self.model.num_generators()
    }

    fn tensor(&self, values: Vec<f32>, rows: usize, cols: usize) -> Tensor<InferenceBackend, 2> {
        Tensor::from_data(TensorData::new(values, [rows, cols]), &self.device)
    }

    fn read(tensor: Tensor<InferenceBackend, 2>) -> Result<Vec<f32>, InferenceError> {
        tensor
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| InferenceError::Tensor(format!("{e:?}")))
    }

    /// Generator probabilities per history row.
    fn priors(&self, histories: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, InferenceError> {
        let cols = self.model.obs_len() * 2;
        let flat: Vec<f32> = histories.iter().flatten().copied().collect();
        let probs = Self::read(self.model.prior(self.tensor(flat, histories.len(), cols)))?;
        Ok(probs
            .chunks(self.model.num_generators())
            .map(<[f32]>::to_vec)
            .collect())
    }

    fn plan(
        &self,
        strategy: PredictionStrategy,
        prior: &[f32],
        count: usize,
        scenario: usize,
        settings: &InferenceSettings,
    ) -> Vec<Draw> {
        let noise_dim = self.model.noise_dim();
        let gaussian = |rng: &mut ChaCha8Rng| -> Vec<f32> {
            (0..noise_dim).map(|_| rng.sample::<f32, _>(StandardNormal)).collect()
        };
        match strategy {
            PredictionStrategy::Sampling | PredictionStrategy::Rejection => {
                let pool = if strategy == PredictionStrategy::Rejection {
                    count * settings.rejection_oversample.max(1)
                } else {
                    count
                };
                let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(settings.seed, scenario, 0));
                let choice = WeightedIndex::<f32>::new(prior.iter().copied()).ok();
                (0..pool)
                    .map(|_| {
                        let generator = match &choice {
                            Some(dist) => dist.sample(&mut rng),
                            None => rng.gen_range(0..prior.len()),
                        };
                        Draw {
                            generator,
                            noise: gaussian(&mut rng),
                        }
                    })
                    .collect()
            }
            PredictionStrategy::Expected | PredictionStrategy::SmartExpected => {
                let smart = strategy == PredictionStrategy::SmartExpected;
                let weights = if smart {
                    confident_weights(prior, settings.smart_min_prior)
                } else {
                    prior.to_vec()
                };
                let mut led = vec![false; weights.len()];
                expected_allocation(&weights, count)
                    .into_iter()
                    .enumerate()
                    .map(|(slot, generator)| {
                        let noise = if smart && !led[generator] {
                            led[generator] = true;
                            vec![0.0; noise_dim]
                        } else {
                            let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(
                                settings.seed,
                                scenario,
                                slot + 1,
                            ));
                            gaussian(&mut rng)
                        };
                        Draw { generator, noise }
                    })
                    .collect()
            }
        }
    }

    /// Run every planned draw, batching rows per generator.
    fn generate(
        &self,
        batch: &[Scenario],
        histories: &[Vec<f32>],
        plans: &[Vec<Draw>],
    ) -> Result<Vec<Vec<Trajectory>>, InferenceError> {
        let hist_cols = self.model.obs_len() * 2;
        let noise_cols = self.model.noise_dim();
        let out_cols = self.model.pred_len() * 2;
        let mut results: Vec<Vec<Option<Trajectory>>> =
            plans.iter().map(|p| vec![None; p.len()]).collect();

        for g in 0..self.model.num_generators() {
            let requests: Vec<(usize, usize)> = plans
                .iter()
                .enumerate()
                .flat_map(|(row, plan)| {
                    plan.iter()
                        .enumerate()
                        .filter(move |(_, d)| d.generator == g)
                        .map(move |(slot, _)| (row, slot))
                })
                .collect();
            if requests.is_empty() {
                continue;
            }

            let mut hist = Vec::with_capacity(requests.len() * hist_cols);
            let mut noise = Vec::with_capacity(requests.len() * noise_cols);
            for &(row, slot) in &requests {
                hist.extend_from_slice(&histories[row]);
                noise.extend_from_slice(&plans[row][slot].noise);
            }
            let rows = requests.len();
            let out = self
                .model
                .generate(
                    g,
                    self.tensor(hist, rows, hist_cols),
                    self.tensor(noise, rows, noise_cols),
                )
                .ok_or(InferenceError::MissingGenerator(g))?;
            let values = Self::read(out)?;

            for (i, &(row, slot)) in requests.iter().enumerate() {
                let origin = batch[row].last_observed().unwrap_or([0.0, 0.0]);
                let rel = &values[i * out_cols..(i + 1) * out_cols];
                results[row][slot] = Some(integrate(origin, rel));
            }
        }

        results
            .into_iter()
            .zip(plans)
            .map(|(slots, plan)| {
                slots
                    .into_iter()
                    .zip(plan)
                    .map(|(t, d)| t.ok_or(InferenceError::MissingGenerator(d.generator)))
                    .collect()
            })
            .collect()
    }
}

impl TrajectoryPredictor for ModelInstance {
    fn generator_params(&self) -> usize {
        self.model.generator_params()
    }

    fn predict(
        &self,
        scenarios: &[Scenario],
        max_candidates: usize,
        strategy: PredictionStrategy,
        settings: &InferenceSettings,
    ) -> Result<PredictionSet, InferenceError> {
        if max_candidates == 0 {
            return Err(InferenceError::InvalidCandidateCount(max_candidates));
        }
        let obs_len = self.model.obs_len();
        let mut out = PredictionSet::new();

        for batch in scenarios.chunks(settings.batch_size.max(1)) {
            let histories = batch
                .iter()
                .map(|s| {
                    if s.observed.len() != obs_len {
                        return Err(InferenceError::HistoryLength {
                            scenario: s.id,
                            expected: obs_len,
                            found: s.observed.len(),
                        });
                    }
                    Ok(s.observed_displacements())
                })
                .collect::<Result<Vec<_>, _>>()?;
            let priors = self.priors(&histories)?;
            let plans: Vec<Vec<Draw>> = batch
                .iter()
                .zip(&priors)
                .map(|(s, prior)| self.plan(strategy, prior, max_candidates, s.id, settings))
                .collect();
            let generated = self.generate(batch, &histories, &plans)?;

            for (scenario, candidates) in batch.iter().zip(generated) {
                let candidates = if strategy == PredictionStrategy::Rejection {
                    let endpoints: Vec<_> = candidates
                        .iter()
                        .map(|t| t.last().copied().unwrap_or([0.0, 0.0]))
                        .collect();
                    diverse_subset(&endpoints, max_candidates)
                        .into_iter()
                        .map(|i| candidates[i].clone())
                        .collect()
                } else {
                    candidates
                };
                out.insert(scenario.id, candidates);
            }
        }
        tracing::debug!(
            strategy = %strategy,
            scenarios = out.len(),
            candidates = max_candidates,
            "predictions complete"
        );
        Ok(out)
    }
}
