#![recursion_limit = "256"]

//! Checkpoint resolution and strategy-driven trajectory prediction.

pub mod checkpoint;
pub mod device;
pub mod error;
pub mod predictor;
pub mod selection;
pub mod strategy;

/// Inference never tracks gradients: the backend is a plain (non-autodiff) one.
#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

pub type InferenceDevice = <InferenceBackend as burn::tensor::backend::Backend>::Device;

pub use checkpoint::{
    init_version_dir, save_checkpoint, BurnModelLoader, CheckpointError, CheckpointId,
    CheckpointResolution, CheckpointResolver, ModelLoader, ResolveError, ResolvedModel,
};
pub use device::{resolve_device, DeviceChoice};
pub use error::InferenceError;
pub use predictor::{InferenceSettings, ModelInstance, TrajectoryPredictor};
pub use strategy::{admits, GateReason, PredictionStrategy, DEFAULT_STRATEGIES};

pub mod prelude {
    pub use crate::checkpoint::{
        BurnModelLoader, CheckpointId, CheckpointResolution, CheckpointResolver, ModelLoader,
    };
    pub use crate::device::{resolve_device, DeviceChoice};
    pub use crate::predictor::{InferenceSettings, ModelInstance, TrajectoryPredictor};
    pub use crate::strategy::{admits, PredictionStrategy};
    pub use crate::{InferenceBackend, InferenceDevice};
}
