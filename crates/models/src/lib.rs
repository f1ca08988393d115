//! Burn modules for multi-generator trajectory prediction.
//!
//! `MultiGenerator` holds one decoder per generator plus a prior network that
//! scores how likely each generator is to explain a given observed history.
//! These are plain Burn modules; checkpoint handling and prediction strategies
//! live in the `inference` crate.

use burn::module::Module;
use burn::nn;
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use data_contracts::ModelConfig;

/// Architecture sizes taken from a model's training config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiGeneratorConfig {
    pub num_gens: usize,
    pub obs_len: usize,
    pub pred_len: usize,
    pub noise_dim: usize,
    /// Hidden width of the prior network.
    pub h_dim: usize,
    /// Hidden width of each generator decoder.
    pub decoder_h_dim: usize,
}

impl Default for MultiGeneratorConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for MultiGeneratorConfig {
    fn from(cfg: &ModelConfig) -> Self {
        Self {
            num_gens: cfg.num_gens,
            obs_len: cfg.obs_len,
            pred_len: cfg.pred_len,
            noise_dim: cfg.noise_dim,
            h_dim: cfg.h_dim,
            decoder_h_dim: cfg.decoder_h_dim,
        }
    }
}

impl MultiGeneratorConfig {
    /// Flattened observed displacements fed to every sub-network.
    pub fn history_dim(&self) -> usize {
        self.obs_len * 2
    }

    pub fn output_dim(&self) -> usize {
        self.pred_len * 2
    }
}

/// Decodes observed displacements plus a noise vector into future displacements.
#[derive(Debug, Module)]
pub struct TrajectoryGenerator<B: Backend> {
    encoder: nn::Linear<B>,
    decoder: nn::Linear<B>,
}

impl<B: Backend> TrajectoryGenerator<B> {
    pub fn new(cfg: &MultiGeneratorConfig, device: &B::Device) -> Self {
        let encoder =
            nn::LinearConfig::new(cfg.history_dim() + cfg.noise_dim, cfg.decoder_h_dim).init(device);
        let decoder = nn::LinearConfig::new(cfg.decoder_h_dim, cfg.output_dim()).init(device);
        Self { encoder, decoder }
    }

    /// `history`: [n, obs_len * 2], `noise`: [n, noise_dim] -> [n, pred_len * 2].
    pub fn forward(&self, history: Tensor<B, 2>, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![history, noise], 1);
        let x = relu(self.encoder.forward(x));
        self.decoder.forward(x)
    }
}

/// Scores generators for an observed history.
#[derive(Debug, Module)]
pub struct PriorNet<B: Backend> {
    hidden: nn::Linear<B>,
    head: nn::Linear<B>,
}

impl<B: Backend> PriorNet<B> {
    pub fn new(cfg: &MultiGeneratorConfig, device: &B::Device) -> Self {
        let hidden = nn::LinearConfig::new(cfg.history_dim(), cfg.h_dim).init(device);
        let head = nn::LinearConfig::new(cfg.h_dim, cfg.num_gens).init(device);
        Self { hidden, head }
    }

    /// `history`: [n, obs_len * 2] -> generator probabilities [n, num_gens].
    pub fn forward(&self, history: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden.forward(history));
        softmax(self.head.forward(x), 1)
    }
}

#[derive(Debug, Module)]
pub struct MultiGenerator<B: Backend> {
    generators: Vec<TrajectoryGenerator<B>>,
    prior: PriorNet<B>,
    obs_len: usize,
    pred_len: usize,
    noise_dim: usize,
}

impl<B: Backend> MultiGenerator<B> {
    pub fn new(cfg: &MultiGeneratorConfig, device: &B::Device) -> Self {
        let generators = (0..cfg.num_gens)
            .map(|_| TrajectoryGenerator::new(cfg, device))
            .collect();
        Self {
            generators,
            prior: PriorNet::new(cfg, device),
            obs_len: cfg.obs_len,
            pred_len: cfg.pred_len,
            noise_dim: cfg.noise_dim,
        }
    }

    pub fn num_generators(&self) -> usize {
        self.generators.len()
    }

    pub fn obs_len(&self) -> usize {
        self.obs_len
    }

    pub fn pred_len(&self) -> usize {
        self.pred_len
    }

    pub fn noise_dim(&self) -> usize {
        self.noise_dim
    }

    /// Trainable parameters across all generators (the prior network is excluded).
    pub fn generator_params(&self) -> usize {
        self.generators.iter().map(|g| g.num_params()).sum()
    }

    /// Generator probabilities for each history row.
    pub fn prior(&self, history: Tensor<B, 2>) -> Tensor<B, 2> {
        self.prior.forward(history)
    }

    /// Run generator `index`; returns `None` when the index is out of range.
    pub fn generate(
        &self,
        index: usize,
        history: Tensor<B, 2>,
        noise: Tensor<B, 2>,
    ) -> Option<Tensor<B, 2>> {
        self.generators
            .get(index)
            .map(|g| g.forward(history, noise))
    }
}
