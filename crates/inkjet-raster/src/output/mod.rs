//! Dither output buffers.

mod dithered_row;

pub use dithered_row::{DitheredRow, PackedLine};
