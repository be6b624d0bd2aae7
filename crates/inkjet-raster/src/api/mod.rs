//! Public API: the [`RasterPipeline`] builder and the unified
//! [`RasterError`].

mod builder;
mod error;

pub use builder::{PipelineSummary, RasterPipeline, RasterPipelineBuilder};
pub use error::RasterError;
