//! Softweave: which pass and nozzle print each row.
//!
//! [`WeaveGeometry`] computes the raw pass layout of a head, [`PassMap`]
//! adapts it to the edges of one page, and [`Softweave`] buffers dithered
//! rows per pass and hands finished passes to a [`PassEmitter`].
//!
//! ```
//! use inkjet_raster::weave::{PageRange, WeaveGeometry, WeaveStrategy, PassMap};
//!
//! let geometry = WeaveGeometry::new(6, 48, 1, WeaveStrategy::ZigZag).unwrap();
//! let map = PassMap::new(geometry, PageRange::rows(1000).unwrap()).unwrap();
//! let placement = map.row_parameters(17, 0).unwrap();
//! assert_eq!(placement.pass_start_row + 6 * placement.jet as i64, 17);
//! ```

mod accumulator;
mod error;
mod geometry;
pub mod pack;
mod passmap;
mod softweave;

pub use accumulator::{FlushedPass, PassAccumulator, PassChannel, PassEmitter};
pub use error::WeaveError;
pub use geometry::{RawPass, RawRow, WeaveGeometry, WeaveStrategy};
pub use pack::{blank_row, pack_bits, unpack_bits, unpack_row, PackError};
pub use passmap::{PageRange, PassMap, PassRecord, RowPlacement};
pub use softweave::Softweave;
