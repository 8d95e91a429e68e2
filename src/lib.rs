//! Parallel Rician denoising of multi-phase arterial spin labeling (ASL) acquisitions.
//!
//! A 4-D stack `(x, y, z, acquisition)` is split along the acquisition axis into one contiguous
//! chunk per worker, each volume is denoised by an external non-local means kernel, and the
//! denoised volumes are reassembled in their original order. The control and inflow phases are
//! then combined into the perfusion difference and its temporal mean.

pub mod chunk;
pub mod combine;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod params;
pub mod partition;
pub mod pipeline;

pub use combine::{combine, split_phases, PerfusionMaps};
pub use engine::{denoise_stack, ParallelDenoiser, StackReport};
pub use error::{AslError, KernelError};
pub use kernel::{NlmSettings, NoiseEstimator, RicianKernel, VolumeDenoiser};
pub use params::AslDenoiseParams;
pub use pipeline::{AslPipeline, AslResult};
