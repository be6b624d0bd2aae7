// Generated threshold tables and the fixed-point dither kernels read
// better with index loops.
#![allow(
    clippy::needless_range_loop,
    clippy::module_inception,
    clippy::manual_range_contains,
    clippy::too_many_arguments
)]

//! inkjet-raster: dithering and softweave for inkjet printers
//!
//! The crate turns scanlines of 16-bit ink amounts into the passes a
//! multi-nozzle print head prints: dot-size bit planes per ink channel,
//! interleaved over passes and packed with PackBits.
//!
//! # Quick Start
//!
//! The [`RasterPipeline`] builder is the primary entry point:
//!
//! ```
//! use inkjet_raster::{
//!     DitherAlgorithm, InkSet, PageRange, RasterPipeline, RowInput, WeaveGeometry,
//!     WeaveStrategy,
//! };
//! use inkjet_raster::weave::FlushedPass;
//!
//! let geometry = WeaveGeometry::new(4, 16, 1, WeaveStrategy::ZigZag).unwrap();
//! let mut pipeline = RasterPipeline::builder(64)
//!     .ink_set(InkSet::Monochrome)
//!     .algorithm(DitherAlgorithm::HybridFloyd)
//!     .weave(geometry, PageRange::rows(100).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut passes: Vec<FlushedPass> = Vec::new();
//! let gray = vec![30000u16; 64];
//! for row in 0..100 {
//!     pipeline.write_row(row, RowInput::Gray(&gray), &mut passes).unwrap();
//! }
//! let summary = pipeline.finish(&mut passes).unwrap();
//! assert_eq!(passes.len(), summary.passes);
//! ```
//!
//! # Pipeline
//!
//! ```text
//! 16-bit ink rows (caller)
//!     |
//!     v
//! DitherEngine           error diffusion / ordered / adaptive / fast
//!     |                  one DitheredRow of bit planes per channel
//!     v
//! Softweave              PassMap: row -> (pass, nozzle)
//!     |                  PassAccumulator: PackBits rows per pass
//!     v
//! PassEmitter            printer command writer, preview, dump file
//! ```
//!
//! # Dithering
//!
//! Seven algorithms are available via [`DitherAlgorithm`]. Every channel
//! has a table of dot-size segments ([`DitherColor`]); the dither decides
//! within the segment containing the pixel's ink amount whether the
//! lighter or the darker dot of the segment is printed. Black is
//! generated from CMY between the `black_lower` and `black_upper` gray
//! levels, and color inks are reduced under black.
//!
//! # Weaving
//!
//! A head with `J` nozzles `S` rows apart prints every row exactly once
//! per oversample phase. [`WeaveGeometry`] numbers raw passes, [`PassMap`]
//! shifts the passes that would hang over the page edges, and the
//! accumulator keeps only a bounded ring of open passes, so a page streams
//! through in one go regardless of its height.

pub mod api;
pub mod channel;
pub mod dither;
pub mod matrix;
pub mod output;
pub mod weave;


pub use api::{PipelineSummary, RasterError, RasterPipeline, RasterPipelineBuilder};
pub use channel::{Channel, ChannelMap, InkSet};
pub use dither::{DitherAlgorithm, DitherColor, DitherEngine, DitherError, DitherOptions, Randomizers, RowInput};
pub use matrix::DitherMatrix;
pub use output::{DitheredRow, PackedLine};
pub use weave::{PageRange, PassEmitter, PassMap, Softweave, WeaveError, WeaveGeometry, WeaveStrategy};
