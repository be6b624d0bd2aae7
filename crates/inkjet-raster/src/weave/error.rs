//! Error types for pass scheduling and accumulation.

use std::fmt;
use std::io;

use super::pack::PackError;

#[derive(Debug)]
pub enum WeaveError {
    /// Row separation between adjacent nozzles was zero.
    ZeroSeparation,
    /// The head has no nozzles.
    ZeroJets,
    /// Oversampling factor was zero.
    ZeroOversample,
    /// More horizontal passes than nozzles: the advance would be zero.
    OversampleExceedsJets { oversample: usize, jets: usize },
    /// Unknown weave strategy id.
    UnknownStrategy(u32),
    /// Unknown weave strategy name.
    UnknownStrategyName(String),
    /// First/last row and page length do not describe a page.
    InvalidPage {
        first_row: usize,
        last_row: usize,
        page_length: usize,
    },
    /// A row outside `first_row..=last_row` was submitted.
    RowOutsidePage {
        row: usize,
        first_row: usize,
        last_row: usize,
    },
    /// Rows must be submitted in strictly increasing order.
    RowOutOfOrder { row: usize, previous: usize },
    /// A pass was opened while its ring slot still held an unflushed pass.
    PassWindowExceeded { pass: i64, occupied_by: i64 },
    /// A dithered row does not have the configured width.
    WidthMismatch { expected: usize, actual: usize },
    /// A dithered row was allocated for another ink set or plane count.
    RowLayoutMismatch,
    /// A packed row failed to decode.
    Pack(PackError),
    /// The pass emitter failed.
    Emit(io::Error),
}

impl fmt::Display for WeaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaveError::ZeroSeparation => write!(f, "nozzle separation must be non-zero"),
            WeaveError::ZeroJets => write!(f, "print head must have at least one nozzle"),
            WeaveError::ZeroOversample => write!(f, "oversample must be non-zero"),
            WeaveError::OversampleExceedsJets { oversample, jets } => write!(
                f,
                "oversample {} exceeds nozzle count {}",
                oversample, jets
            ),
            WeaveError::UnknownStrategy(id) => write!(f, "unknown weave strategy {}", id),
            WeaveError::UnknownStrategyName(name) => {
                write!(f, "unknown weave strategy '{}'", name)
            }
            WeaveError::InvalidPage {
                first_row,
                last_row,
                page_length,
            } => write!(
                f,
                "invalid page: rows {}..={} on a page of {} rows",
                first_row, last_row, page_length
            ),
            WeaveError::RowOutsidePage {
                row,
                first_row,
                last_row,
            } => write!(f, "row {} outside page rows {}..={}", row, first_row, last_row),
            WeaveError::RowOutOfOrder { row, previous } => {
                write!(f, "row {} submitted after row {}", row, previous)
            }
            WeaveError::PassWindowExceeded { pass, occupied_by } => write!(
                f,
                "pass {} cannot open: buffer slot still holds pass {}",
                pass, occupied_by
            ),
            WeaveError::WidthMismatch { expected, actual } => {
                write!(f, "row width {} does not match weave width {}", actual, expected)
            }
            WeaveError::RowLayoutMismatch => {
                write!(f, "row channels do not match the weave layout")
            }
            WeaveError::Pack(e) => write!(f, "packbits error: {}", e),
            WeaveError::Emit(e) => write!(f, "pass emitter failed: {}", e),
        }
    }
}

impl std::error::Error for WeaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WeaveError::Pack(e) => Some(e),
            WeaveError::Emit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for WeaveError {
    fn from(e: PackError) -> Self {
        WeaveError::Pack(e)
    }
}

impl From<io::Error> for WeaveError {
    fn from(e: io::Error) -> Self {
        WeaveError::Emit(e)
    }
}
