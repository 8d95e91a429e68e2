// Parallel denoising of a 4-D acquisition stack
// the stack is split along the acquisition axis (axis 3) into one contiguous chunk per worker.
// Every chunk is processed on its own worker of a pool that only lives for the duration of the
// call. Results come back in completion order, tagged with their chunk index, and are put back
// into submission order before the volumes are written into the output stack.

use crate::chunk::{process_chunk, Chunk, DenoisedChunk};
use crate::error::AslError;
use crate::kernel::{NoiseEstimator, VolumeDenoiser};
use crate::params::AslDenoiseParams;
use crate::partition::{available_workers, partition, worker_count};
use ndarray::{Array4, ArrayView4, ArrayViewD, Axis, Ix4, ShapeBuilder};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use tracing::{debug, error, info};

/// describes how a stack was split and the noise level estimated for each acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackReport {
    pub workers: usize,
    pub chunks: Vec<Range<usize>>,
    /// estimated Rician sigma, indexed by acquisition
    pub sigmas: Vec<f32>,
}

impl StackReport {
    pub fn to_json(&self) -> Result<String, AslError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// checks that a stack can be denoised and returns its shape
pub fn validate_stack(stack: &ArrayView4<f32>) -> Result<[usize; 4], AslError> {
    let shape: [usize; 4] = stack.dim().into();
    if shape[3] == 0 {
        return Err(AslError::EmptyAcquisitionAxis);
    }
    if shape[0..3].iter().any(|&n| n == 0) {
        return Err(AslError::EmptySpatialAxis { shape });
    }
    Ok(shape)
}

#[derive(Debug, Clone, Default)]
pub struct ParallelDenoiser {
    params: AslDenoiseParams,
    /// exact worker budget, bypassing the detected core count
    forced_workers: Option<usize>,
}

impl ParallelDenoiser {
    pub fn new(params: AslDenoiseParams) -> Self {
        Self { params, forced_workers: None }
    }

    /// denoiser that runs at most `n` workers, and never more than the detected core count
    pub fn with_max_workers(n: usize) -> Self {
        Self::new(AslDenoiseParams { max_workers: Some(n), ..Default::default() })
    }

    /// denoiser that runs exactly `min(n, acquisitions)` workers whatever the host provides
    #[cfg(test)]
    pub(crate) fn with_workers(n: usize) -> Self {
        Self { params: AslDenoiseParams::default(), forced_workers: Some(n) }
    }

    pub fn params(&self) -> &AslDenoiseParams {
        &self.params
    }

    /// denoises every acquisition of `stack`, returning a stack of identical shape where
    /// acquisition `i` of the output is the denoised acquisition `i` of the input
    pub fn denoise_stack<K>(&self, stack: ArrayView4<f32>, kernel: &K) -> Result<Array4<f32>, AslError>
    where
        K: NoiseEstimator + VolumeDenoiser,
    {
        self.denoise_stack_with_report(stack, kernel).map(|(out, _)| out)
    }

    /// same as [Self::denoise_stack] for arrays of unknown dimensionality
    pub fn denoise_stack_dyn<K>(&self, stack: ArrayViewD<f32>, kernel: &K) -> Result<Array4<f32>, AslError>
    where
        K: NoiseEstimator + VolumeDenoiser,
    {
        let ndim = stack.ndim();
        let stack = stack.into_dimensionality::<Ix4>().map_err(|_| AslError::NotFourDimensional { ndim })?;
        self.denoise_stack(stack, kernel)
    }

    pub fn denoise_stack_with_report<K>(&self, stack: ArrayView4<f32>, kernel: &K) -> Result<(Array4<f32>, StackReport), AslError>
    where
        K: NoiseEstimator + VolumeDenoiser,
    {
        self.params.validate_workers()?;
        let [nx, ny, nz, nq] = validate_stack(&stack)?;

        let budget = self.forced_workers.unwrap_or_else(|| available_workers(self.params.max_workers));
        let n_workers = worker_count(budget, nq);
        let ranges = partition(nq, n_workers);
        info!(workers = n_workers, acquisitions = nq, chunks = ?ranges, "denoising stack");

        let chunks: Vec<Chunk> = ranges.iter().cloned().enumerate()
            .map(|(idx, r)| Chunk::new(idx, r, stack.view()))
            .collect();

        let denoised = dispatch(&chunks, kernel, n_workers)?;

        // write chunk volumes back into acquisition order
        let mut out = Array4::<f32>::zeros((nx, ny, nz, nq).f());
        let volumes = denoised.iter().flat_map(|c| c.volumes.iter());
        out.axis_iter_mut(Axis(3)).zip(volumes).for_each(|(mut dst, src)| {
            dst.assign(src);
        });

        let sigmas = denoised.iter().flat_map(|c| c.sigmas.iter().copied()).collect();
        let report = StackReport { workers: n_workers, chunks: ranges, sigmas };

        Ok((out, report))
    }
}

/// denoises a stack using all available cores
pub fn denoise_stack<K>(stack: ArrayView4<f32>, kernel: &K) -> Result<Array4<f32>, AslError>
where
    K: NoiseEstimator + VolumeDenoiser,
{
    ParallelDenoiser::default().denoise_stack(stack, kernel)
}

/// runs every chunk on a dedicated worker of a pool built for this call only, returning the
/// denoised chunks in submission order
fn dispatch<K>(chunks: &[Chunk], kernel: &K, n_workers: usize) -> Result<Vec<DenoisedChunk>, AslError>
where
    K: NoiseEstimator + VolumeDenoiser,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .thread_name(|i| format!("asl-denoise-{i}"))
        .build()?;

    let (tx, rx) = mpsc::channel();

    // the scope returns only after every spawned chunk has finished
    pool.scope(|s| {
        for chunk in chunks {
            let tx = tx.clone();
            s.spawn(move |_| {
                let result = catch_unwind(AssertUnwindSafe(|| process_chunk(chunk, kernel)))
                    .unwrap_or_else(|_| Err(AslError::WorkerLost { chunk: chunk.index, range: chunk.range.clone() }));
                // the receiver outlives the scope
                let _ = tx.send((chunk.index, result));
            });
        }
    });
    drop(tx);
    drop(pool);

    let mut results: Vec<(usize, Result<DenoisedChunk, AslError>)> = rx.into_iter().collect();
    debug!(received = results.len(), expected = chunks.len(), "workers joined");

    // completion order is arbitrary
    results.sort_by_key(|(idx, _)| *idx);

    let mut denoised = Vec::with_capacity(chunks.len());
    let mut results = results.into_iter();
    for chunk in chunks {
        match results.next() {
            Some((idx, Ok(c))) if idx == chunk.index => denoised.push(c),
            Some((idx, Err(e))) if idx == chunk.index => {
                error!(chunk = chunk.index, "chunk failed: {e}");
                return Err(e);
            }
            _ => {
                error!(chunk = chunk.index, "chunk did not report a result");
                return Err(AslError::WorkerLost { chunk: chunk.index, range: chunk.range.clone() });
            }
        }
    }
    Ok(denoised)
}
