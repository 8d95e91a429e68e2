use std::ops::Range;
use thiserror::Error;

/// error raised by an external noise estimator or volume denoiser
pub type KernelError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum AslError {
    #[error("expected a 4-D volume stack, got {ndim} dimensions")]
    NotFourDimensional { ndim: usize },
    #[error("acquisition axis must contain at least one volume")]
    EmptyAcquisitionAxis,
    #[error("spatial axes must be non-empty, got shape {shape:?}")]
    EmptySpatialAxis { shape: [usize; 4] },
    #[error("control stack {control:?} and inflow stack {inflow:?} differ in shape")]
    ShapeMismatch { control: [usize; 4], inflow: [usize; 4] },
    #[error("cannot split {acquisitions} acquisitions into control and inflow halves")]
    OddPhaseCount { acquisitions: usize },
    #[error("chunk {chunk} failed on acquisition {acquisition}: {source}")]
    Worker {
        chunk: usize,
        acquisition: usize,
        #[source]
        source: KernelError,
    },
    #[error("chunk {chunk}: denoised acquisition {acquisition} has shape {found:?}, expected {expected:?}")]
    DenoisedShape {
        chunk: usize,
        acquisition: usize,
        expected: [usize; 3],
        found: [usize; 3],
    },
    #[error("chunk {chunk} covering acquisitions {range:?} did not report a result")]
    WorkerLost { chunk: usize, range: Range<usize> },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("invalid parameters: {0}")]
    Params(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse parameter file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize parameters: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AslError {
    /// acquisition index a worker failure refers to, if any
    pub fn acquisition(&self) -> Option<usize> {
        match self {
            Self::Worker { acquisition, .. } | Self::DenoisedShape { acquisition, .. } => Some(*acquisition),
            _ => None,
        }
    }

    /// chunk index a worker failure refers to, if any
    pub fn chunk(&self) -> Option<usize> {
        match self {
            Self::Worker { chunk, .. } | Self::DenoisedShape { chunk, .. } | Self::WorkerLost { chunk, .. } => Some(*chunk),
            _ => None,
        }
    }
}
