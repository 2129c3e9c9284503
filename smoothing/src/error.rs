use thiserror::Error;

/// Errors raised while applying a kernel to a volume
#[derive(Error, Debug)]
pub enum SmoothingError {
    #[error("smoothing was cancelled")]
    Cancelled,

    #[error("kernel holds {actual} samples but its lengths describe {expected}")]
    KernelShapeMismatch { expected: usize, actual: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
