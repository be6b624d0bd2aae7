//! Error types for dither configuration.

use std::fmt;

use crate::channel::Channel;

/// Configuration and precondition errors raised by the dither engine.
///
/// All of these are detected before or at the first scanline; a job that
/// hits one must be abandoned.
#[derive(Debug, Clone, PartialEq)]
pub enum DitherError {
    /// An ink range table was built from zero levels.
    EmptyInkRange,
    /// A threshold table does not match its declared dimensions.
    MatrixSize {
        width: usize,
        height: usize,
        len: usize,
    },
    /// A matrix dimension or iteration exponent was zero.
    DegenerateMatrix,
    /// The output width was zero.
    ZeroWidth,
    /// A scanline or output row does not match the configured width.
    WidthMismatch { expected: usize, actual: usize },
    /// The row input kind does not fit the configured ink set.
    InputMismatch { expected: &'static str },
    /// Ranges were supplied for a channel the ink set does not carry.
    ChannelNotInInkSet(Channel),
    /// Unknown dither algorithm name.
    UnknownAlgorithm(String),
    /// A tuning value was outside its accepted range.
    InvalidParameter {
        name: &'static str,
        value: f64,
    },
}

impl fmt::Display for DitherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DitherError::EmptyInkRange => write!(f, "ink range table must have at least one level"),
            DitherError::MatrixSize { width, height, len } => write!(
                f,
                "threshold table has {} entries, expected {}x{} = {}",
                len,
                width,
                height,
                width * height
            ),
            DitherError::DegenerateMatrix => write!(f, "matrix size and exponent must be non-zero"),
            DitherError::ZeroWidth => write!(f, "output width must be non-zero"),
            DitherError::WidthMismatch { expected, actual } => {
                write!(f, "scanline width {} does not match configured width {}", actual, expected)
            }
            DitherError::InputMismatch { expected } => {
                write!(f, "row input does not match ink set, expected {} input", expected)
            }
            DitherError::ChannelNotInInkSet(channel) => {
                write!(f, "channel {} is not part of the configured ink set", channel)
            }
            DitherError::UnknownAlgorithm(name) => write!(f, "unknown dither algorithm: {:?}", name),
            DitherError::InvalidParameter { name, value } => {
                write!(f, "invalid value {} for {}", value, name)
            }
        }
    }
}

impl std::error::Error for DitherError {}
