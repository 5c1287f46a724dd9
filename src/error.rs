// error.rs — Crate-level error.

use crate::gpu::error::GpuError;
use crate::ppm::PpmError;

/// Any failure of a blur run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ppm(#[from] PpmError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The device status code, if this is a GPU failure.
    pub fn gpu_code(&self) -> Option<i32> {
        match self {
            Error::Gpu(e) => Some(e.code()),
            _ => None,
        }
    }
}
