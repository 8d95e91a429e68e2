use crate::combine::{combine, split_phases, PerfusionMaps};
use crate::engine::{ParallelDenoiser, StackReport};
use crate::error::AslError;
use crate::kernel::{NoiseEstimator, VolumeDenoiser};
use crate::params::AslDenoiseParams;
use ndarray::{Array3, Array4, ArrayView4};
use std::time::Instant;
use tracing::info;

/// everything produced by one ASL denoising run. Persisting the arrays is left to the caller.
#[derive(Debug, Clone)]
pub struct AslResult {
    pub control: Array4<f32>,
    pub inflow: Array4<f32>,
    pub difference: Array4<f32>,
    pub mean: Array3<f32>,
    pub control_report: StackReport,
    pub inflow_report: StackReport,
}

#[derive(Debug, Clone, Default)]
pub struct AslPipeline {
    denoiser: ParallelDenoiser,
}

impl AslPipeline {
    pub fn new(params: AslDenoiseParams) -> Self {
        Self { denoiser: ParallelDenoiser::new(params) }
    }

    pub fn with_denoiser(denoiser: ParallelDenoiser) -> Self {
        Self { denoiser }
    }

    /// denoises a stack holding all control acquisitions followed by all inflow acquisitions
    pub fn run<K>(&self, stack: ArrayView4<f32>, kernel: &K) -> Result<AslResult, AslError>
    where
        K: NoiseEstimator + VolumeDenoiser,
    {
        let (control, inflow) = split_phases(stack)?;
        self.run_phases(control, inflow, kernel)
    }

    pub fn run_phases<K>(&self, control: ArrayView4<f32>, inflow: ArrayView4<f32>, kernel: &K) -> Result<AslResult, AslError>
    where
        K: NoiseEstimator + VolumeDenoiser,
    {
        // fail before spending time on the first phase
        let control_shape: [usize; 4] = control.dim().into();
        let inflow_shape: [usize; 4] = inflow.dim().into();
        if control_shape != inflow_shape {
            return Err(AslError::ShapeMismatch { control: control_shape, inflow: inflow_shape });
        }

        let now = Instant::now();
        info!("denoising control images ...");
        let (control, control_report) = self.denoiser.denoise_stack_with_report(control, kernel)?;

        info!("denoising inflow images ...");
        let (inflow, inflow_report) = self.denoiser.denoise_stack_with_report(inflow, kernel)?;

        info!("computing perfusion difference ...");
        let PerfusionMaps { difference, mean } = combine(control.view(), inflow.view())?;
        info!(secs = now.elapsed().as_secs_f32(), "asl denoising finished");

        Ok(AslResult { control, inflow, difference, mean, control_report, inflow_report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::stubs::{FailOn, Identity, TagScale, TagSigma};
    use crate::kernel::RicianKernel;
    use ndarray::{Array4, Axis, ShapeBuilder};

    #[test]
    fn full_run_on_concatenated_stack() {
        // control acquisitions carry tags 0..4, inflow 4..8
        let stack = crate::chunk::tests::tagged_stack([4, 4, 3], 8);
        let kernel = RicianKernel::new(TagSigma, TagScale);
        let result = AslPipeline::with_denoiser(ParallelDenoiser::with_workers(3)).run(stack.view(), &kernel).unwrap();

        assert_eq!(result.control.dim(), (4, 4, 3, 4));
        assert_eq!(result.inflow.dim(), (4, 4, 3, 4));
        assert_eq!(result.control_report.chunks, vec![0..2, 2..3, 3..4]);
        assert_eq!(result.inflow_report.sigmas, vec![4., 5., 6., 7.]);

        for l in 0..4 {
            let c = stack.index_axis(Axis(3), l).mapv(|x| x * TagScale::factor(l));
            let i = stack.index_axis(Axis(3), l + 4).mapv(|x| x * TagScale::factor(l + 4));
            assert_eq!(result.control.index_axis(Axis(3), l), c);
            assert_eq!(result.inflow.index_axis(Axis(3), l), i);
            assert_eq!(result.difference.index_axis(Axis(3), l), &c - &i);
        }
        assert_eq!(result.mean.dim(), (4, 4, 3));
    }

    #[test]
    fn identity_kernel_gives_plain_subtraction() {
        let control = Array4::from_elem((3, 3, 3, 4).f(), 5f32);
        let inflow = Array4::from_elem((3, 3, 3, 4).f(), 2f32);
        let kernel = RicianKernel::new(TagSigma, Identity);
        let result = AslPipeline::default().run_phases(control.view(), inflow.view(), &kernel).unwrap();
        assert!(result.difference.iter().all(|&d| d == 3.));
        assert!(result.mean.iter().all(|&m| m == 3.));
    }

    #[test]
    fn mismatched_phases_fail_before_denoising() {
        let control = Array4::<f32>::zeros((3, 3, 3, 4));
        let inflow = Array4::<f32>::zeros((3, 3, 2, 4));
        let kernel = RicianKernel::new(TagSigma, FailOn(0));
        let err = AslPipeline::default().run_phases(control.view(), inflow.view(), &kernel).unwrap_err();
        assert!(matches!(err, AslError::ShapeMismatch { .. }));
    }

    #[test]
    fn inflow_failure_aborts_run() {
        let stack = crate::chunk::tests::tagged_stack([2, 2, 2], 6);
        let kernel = RicianKernel::new(TagSigma, FailOn(4));
        let err = AslPipeline::with_denoiser(ParallelDenoiser::with_workers(2)).run(stack.view(), &kernel).unwrap_err();
        // tag 4 is acquisition 1 of the inflow half
        assert_eq!(err.acquisition(), Some(1));
        assert_eq!(err.chunk(), Some(0));
    }
}
