//! Unified error type for the raster pipeline.

use std::fmt;
use std::io;

use crate::dither::DitherError;
use crate::weave::WeaveError;

/// Any failure of a [`RasterPipeline`](super::RasterPipeline).
///
/// Configuration problems surface from
/// [`RasterPipelineBuilder::build`](super::RasterPipelineBuilder::build)
/// before the first row is dithered.
///
/// # Example
///
/// ```
/// use inkjet_raster::{RasterError, RasterPipeline, WeaveGeometry, WeaveStrategy};
///
/// fn geometry() -> Result<WeaveGeometry, RasterError> {
///     Ok(WeaveGeometry::new(8, 32, 2, WeaveStrategy::ZigZag)?)
/// }
/// assert!(geometry().is_ok());
/// ```
#[derive(Debug)]
pub enum RasterError {
    /// Dither configuration or input error.
    Dither(DitherError),
    /// Weave configuration or row ordering error.
    Weave(WeaveError),
    /// The pass emitter failed.
    Emit(io::Error),
    /// Neither a weave nor a page range was configured.
    NoPage,
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::Dither(err) => write!(f, "dither error: {}", err),
            RasterError::Weave(err) => write!(f, "weave error: {}", err),
            RasterError::Emit(err) => write!(f, "emit error: {}", err),
            RasterError::NoPage => write!(f, "no page range configured"),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::Dither(err) => Some(err),
            RasterError::Weave(err) => Some(err),
            RasterError::Emit(err) => Some(err),
            RasterError::NoPage => None,
        }
    }
}

impl From<DitherError> for RasterError {
    fn from(err: DitherError) -> Self {
        RasterError::Dither(err)
    }
}

impl From<WeaveError> for RasterError {
    fn from(err: WeaveError) -> Self {
        match err {
            WeaveError::Emit(io) => RasterError::Emit(io),
            other => RasterError::Weave(other),
        }
    }
}

impl From<io::Error> for RasterError {
    fn from(err: io::Error) -> Self {
        RasterError::Emit(err)
    }
}
