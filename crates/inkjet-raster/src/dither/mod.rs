//! Multi-level dithering of ink intensities into dot bit planes.
//!
//! The [`DitherEngine`] turns one scanline of 16-bit ink amounts into
//! per-channel bit planes. It supports error diffusion with a
//! matrix-jittered or random threshold, ordered (matrix) dithering, an
//! adaptive mix of the two, and fast single-comparison paths.
//!
//! # Example
//!
//! ```
//! use inkjet_raster::dither::{DitherAlgorithm, DitherEngine, RowInput};
//! use inkjet_raster::InkSet;
//!
//! let mut engine = DitherEngine::new(64, InkSet::Monochrome, DitherAlgorithm::Ordered, 1).unwrap();
//! let mut out = engine.new_row();
//! let gray = vec![65535u16; 64];
//! engine.dither_row(0, RowInput::Gray(&gray), &mut out).unwrap();
//! ```

mod engine;
mod error;
pub mod error_rows;
mod options;
mod print_color;
pub mod ranges;
mod separation;

use std::fmt;
use std::str::FromStr;

pub use engine::{DitherEngine, RowInput};
pub use error::DitherError;
pub use error_rows::{ErrorRows, ScanDirection, SpreadTables, MAX_SPREAD};
pub use options::{DitherOptions, Randomizers};
pub use ranges::{DitherColor, DitherSegment, FullDitherRange, SimpleDitherRange};

/// The seven dither algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DitherAlgorithm {
    /// Error diffusion with matrix-jittered thresholds.
    #[default]
    HybridFloyd,
    /// Error diffusion with random thresholds.
    RandomFloyd,
    /// Ordered dither in highlights, hybrid diffusion elsewhere.
    AdaptiveHybrid,
    /// Ordered dither in highlights, random diffusion elsewhere.
    AdaptiveRandom,
    /// Pure matrix dither.
    Ordered,
    /// Single comparison against the matrix.
    Fast,
    /// Single comparison against a 64x64 iterated matrix.
    VeryFast,
}

impl DitherAlgorithm {
    pub const ALL: [DitherAlgorithm; 7] = [
        DitherAlgorithm::AdaptiveHybrid,
        DitherAlgorithm::Ordered,
        DitherAlgorithm::Fast,
        DitherAlgorithm::VeryFast,
        DitherAlgorithm::AdaptiveRandom,
        DitherAlgorithm::HybridFloyd,
        DitherAlgorithm::RandomFloyd,
    ];

    /// Display name as shown to users.
    pub const fn name(self) -> &'static str {
        match self {
            DitherAlgorithm::HybridFloyd => "Hybrid Floyd-Steinberg",
            DitherAlgorithm::RandomFloyd => "Random Floyd-Steinberg",
            DitherAlgorithm::AdaptiveHybrid => "Adaptive Hybrid",
            DitherAlgorithm::AdaptiveRandom => "Adaptive Random",
            DitherAlgorithm::Ordered => "Ordered",
            DitherAlgorithm::Fast => "Fast",
            DitherAlgorithm::VeryFast => "Very Fast",
        }
    }

    /// Short kebab-case alias accepted by [`FromStr`].
    pub const fn alias(self) -> &'static str {
        match self {
            DitherAlgorithm::HybridFloyd => "hybrid-floyd",
            DitherAlgorithm::RandomFloyd => "random-floyd",
            DitherAlgorithm::AdaptiveHybrid => "adaptive-hybrid",
            DitherAlgorithm::AdaptiveRandom => "adaptive-random",
            DitherAlgorithm::Ordered => "ordered",
            DitherAlgorithm::Fast => "fast",
            DitherAlgorithm::VeryFast => "very-fast",
        }
    }

    /// Matrix dither with no carried error.
    #[inline]
    pub fn is_ordered(self) -> bool {
        matches!(self, DitherAlgorithm::Ordered)
    }

    #[inline]
    pub fn is_fast(self) -> bool {
        matches!(self, DitherAlgorithm::Fast | DitherAlgorithm::VeryFast)
    }

    #[inline]
    pub fn is_adaptive(self) -> bool {
        matches!(
            self,
            DitherAlgorithm::AdaptiveHybrid | DitherAlgorithm::AdaptiveRandom
        )
    }

    /// Carries error between pixels and rows.
    #[inline]
    pub fn is_diffusion(self) -> bool {
        !self.is_ordered() && !self.is_fast()
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DitherAlgorithm {
    type Err = DitherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DitherAlgorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(wanted) || a.alias().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DitherError::UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for algo in DitherAlgorithm::ALL {
            assert_eq!(algo.name().parse::<DitherAlgorithm>(), Ok(algo));
            assert_eq!(algo.alias().parse::<DitherAlgorithm>(), Ok(algo));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "hybrid floyd-steinberg".parse::<DitherAlgorithm>(),
            Ok(DitherAlgorithm::HybridFloyd)
        );
        assert_eq!("VERY FAST".parse::<DitherAlgorithm>(), Ok(DitherAlgorithm::VeryFast));
    }

    #[test]
    fn test_unknown_algorithm() {
        assert_eq!(
            "Stucki".parse::<DitherAlgorithm>(),
            Err(DitherError::UnknownAlgorithm("Stucki".to_string()))
        );
    }

    #[test]
    fn test_families() {
        assert_eq!(DitherAlgorithm::default(), DitherAlgorithm::HybridFloyd);
        assert!(DitherAlgorithm::RandomFloyd.is_diffusion());
        assert!(DitherAlgorithm::AdaptiveRandom.is_diffusion());
        assert!(!DitherAlgorithm::Ordered.is_diffusion());
        assert!(!DitherAlgorithm::VeryFast.is_diffusion());
        assert!(DitherAlgorithm::Fast.is_fast());
    }
}
