// Pluggable Rician denoising kernel
// the patch search and noise estimation live outside this crate. The engine only needs a way to
// estimate a scalar noise level for a volume and a way to denoise a volume given that level.

use crate::error::KernelError;
use ndarray::{Array3, ArrayView3};

/// multiplier applied to the estimated Rician sigma to form the filter strength
pub const SIGMA_SCALE: f32 = 1.15;

/// spatial patch size (per axis) of the non-local means kernel
pub const PATCH_SIZE: usize = 5;

/// search neighborhood radius (per axis). A radius of 6 gives a 13 x 13 x 13 search area.
pub const SEARCH_RADIUS: usize = 6;

/// settings handed to a [VolumeDenoiser] for a single volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NlmSettings {
    /// filter strength (h) in signal units
    pub scale: f32,
    pub patch_size: usize,
    pub search_radius: usize,
    pub multichannel: bool,
    pub preserve_range: bool,
    /// approximate patch distances. Never enabled by this crate.
    pub fast_mode: bool,
}

impl NlmSettings {
    /// builds the fixed kernel configuration for a volume with estimated noise level `sigma`
    pub fn for_sigma(sigma: f32) -> Self {
        Self {
            scale: SIGMA_SCALE * sigma,
            patch_size: PATCH_SIZE,
            search_radius: SEARCH_RADIUS,
            multichannel: false,
            preserve_range: true,
            fast_mode: false,
        }
    }
}

/// estimates the Rician noise level of a single 3-D magnitude volume
pub trait NoiseEstimator: Send + Sync {
    fn estimate(&self, volume: ArrayView3<f32>) -> Result<f32, KernelError>;
}

/// denoises a single 3-D volume. The returned volume must have the same shape as the input.
pub trait VolumeDenoiser: Send + Sync {
    fn denoise(&self, volume: ArrayView3<f32>, settings: &NlmSettings) -> Result<Array3<f32>, KernelError>;
}

/// bundles an estimator and a denoiser into a single kernel value
#[derive(Debug, Clone)]
pub struct RicianKernel<E, D> {
    pub estimator: E,
    pub denoiser: D,
}

impl<E, D> RicianKernel<E, D> {
    pub fn new(estimator: E, denoiser: D) -> Self {
        Self { estimator, denoiser }
    }
}

impl<E: NoiseEstimator, D: Send + Sync> NoiseEstimator for RicianKernel<E, D> {
    fn estimate(&self, volume: ArrayView3<f32>) -> Result<f32, KernelError> {
        self.estimator.estimate(volume)
    }
}

impl<E: Send + Sync, D: VolumeDenoiser> VolumeDenoiser for RicianKernel<E, D> {
    fn denoise(&self, volume: ArrayView3<f32>, settings: &NlmSettings) -> Result<Array3<f32>, KernelError> {
        self.denoiser.denoise(volume, settings)
    }
}
