pub mod lut;
pub mod preview;
pub mod source;
pub mod test_chart;

pub use lut::ToneLut;
pub use preview::PreviewCanvas;
pub use source::{Resampler, RowSource};
pub use test_chart::{Rgb16, TestChart};
