use crate::error::AslError;
use crate::kernel::{NlmSettings, NoiseEstimator, VolumeDenoiser};
use ndarray::{Array3, ArrayView4, Axis, Slice};
use std::ops::Range;
use tracing::{debug, trace};

/// a contiguous run of acquisitions assigned to one worker
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    /// position of the chunk in submission order
    pub index: usize,
    /// acquisition indices of the source stack covered by this chunk
    pub range: Range<usize>,
    /// (x, y, z, k) view of the source stack
    pub data: ArrayView4<'a, f32>,
}

impl<'a> Chunk<'a> {
    /// slices the acquisitions in `range` out of `stack` without copying
    pub fn new(index: usize, range: Range<usize>, stack: ArrayView4<'a, f32>) -> Self {
        let data = stack.slice_axis_move(Axis(3), Slice::from(range.clone()));
        Self { index, range, data }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// denoised volumes of one chunk, in the same relative order as the source acquisitions
#[derive(Debug, Clone)]
pub struct DenoisedChunk {
    pub index: usize,
    pub range: Range<usize>,
    pub volumes: Vec<Array3<f32>>,
    /// estimated Rician sigma of each source volume
    pub sigmas: Vec<f32>,
}

/// Runs noise estimation and denoising on every volume of a chunk in acquisition order. The
/// first failing volume aborts the chunk, and the error carries the global acquisition index.
pub fn process_chunk<K>(chunk: &Chunk, kernel: &K) -> Result<DenoisedChunk, AslError>
where
    K: NoiseEstimator + VolumeDenoiser,
{
    debug!(chunk = chunk.index, acquisitions = ?chunk.range, "processing chunk");

    let (nx, ny, nz, _) = chunk.data.dim();
    let expected = [nx, ny, nz];

    let mut volumes = Vec::with_capacity(chunk.len());
    let mut sigmas = Vec::with_capacity(chunk.len());

    for (local, vol) in chunk.data.axis_iter(Axis(3)).enumerate() {
        let acquisition = chunk.range.start + local;
        let worker_err = |source| AslError::Worker { chunk: chunk.index, acquisition, source };

        let sigma = kernel.estimate(vol.view()).map_err(worker_err)?;
        trace!(acquisition, sigma, "estimated rician noise");

        let settings = NlmSettings::for_sigma(sigma);
        let denoised = kernel.denoise(vol.view(), &settings).map_err(worker_err)?;

        let found: [usize; 3] = denoised.dim().into();
        if found != expected {
            return Err(AslError::DenoisedShape { chunk: chunk.index, acquisition, expected, found });
        }

        volumes.push(denoised);
        sigmas.push(sigma);
    }

    debug!(chunk = chunk.index, "chunk finished");
    Ok(DenoisedChunk {
        index: chunk.index,
        range: chunk.range.clone(),
        volumes,
        sigmas,
    })
}
