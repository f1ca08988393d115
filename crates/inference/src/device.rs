use crate::{InferenceDevice, InferenceError};
use std::str::FromStr;

/// Compute device requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChoice {
    Cpu,
    Gpu,
}

impl FromStr for DeviceChoice {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(DeviceChoice::Cpu),
            "cuda" | "gpu" | "wgpu" => Ok(DeviceChoice::Gpu),
            other if other.starts_with("cuda:") => Ok(DeviceChoice::Gpu),
            _ => Err(InferenceError::UnknownDevice(s.to_string())),
        }
    }
}

/// Map a device choice onto the compiled backend.
#[cfg(feature = "backend-wgpu")]
pub fn resolve_device(choice: DeviceChoice) -> InferenceDevice {
    match choice {
        DeviceChoice::Gpu => burn_wgpu::WgpuDevice::DefaultDevice,
        DeviceChoice::Cpu => burn_wgpu::WgpuDevice::Cpu,
    }
}

/// Map a device choice onto the compiled backend.
#[cfg(not(feature = "backend-wgpu"))]
pub fn resolve_device(choice: DeviceChoice) -> InferenceDevice {
    if choice == DeviceChoice::Gpu {
        tracing::warn!(
            "backend-wgpu feature not enabled; rebuild with --features backend-wgpu for GPU inference. Using the CPU backend"
        );
    }
    burn_ndarray::NdArrayDevice::Cpu
}
