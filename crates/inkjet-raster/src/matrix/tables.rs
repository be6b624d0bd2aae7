//! Precomputed threshold tables and base-matrix selection.

use crate::dither::DitherError;

use super::DitherMatrix;

// QUICK_257 and RECT_367_179, generated by build.rs
include!(concat!(env!("OUT_DIR"), "/threshold_tables.rs"));

/// Seed of the 2x2 iterated matrix.
pub const SQ2: [u32; 4] = [0, 2, 3, 1];

/// Iterations of [`SQ2`] for the fast matrix (64x64).
pub const FAST_STEPS: u32 = 6;

pub(crate) const QUICK_SIZE: usize = 257;
pub(crate) const RECT_WIDTH: usize = 367;
pub(crate) const RECT_HEIGHT: usize = 179;

/// Which base threshold table a job dithers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdTable {
    /// 64x64 iterated matrix, cheap to index with a mask.
    Iterated64,
    /// 257x257 table for square pixels.
    Square257,
    /// 367x179 table for pixels twice as tall as wide.
    Rect367x179,
    /// The 367x179 table transposed, for pixels twice as wide as tall.
    Rect179x367,
}

impl ThresholdTable {
    /// Pick the table for a resolution aspect.
    ///
    /// Only exact integer 2:1 ratios select a rectangular table.
    pub fn for_aspect(x_aspect: u32, y_aspect: u32) -> Self {
        let x_aspect = x_aspect.max(1);
        let y_aspect = y_aspect.max(1);
        if y_aspect / x_aspect == 2 {
            ThresholdTable::Rect367x179
        } else if x_aspect / y_aspect == 2 {
            ThresholdTable::Rect179x367
        } else {
            ThresholdTable::Square257
        }
    }

    pub fn build(self) -> Result<DitherMatrix, DitherError> {
        match self {
            ThresholdTable::Iterated64 => DitherMatrix::iterated(2, FAST_STEPS, &SQ2),
            ThresholdTable::Square257 => {
                DitherMatrix::from_table(QUICK_SIZE, QUICK_SIZE, &QUICK_257, false)
            }
            ThresholdTable::Rect367x179 => {
                DitherMatrix::from_table(RECT_WIDTH, RECT_HEIGHT, &RECT_367_179, false)
            }
            ThresholdTable::Rect179x367 => {
                DitherMatrix::from_table(RECT_HEIGHT, RECT_WIDTH, &RECT_367_179, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(table: &[u32]) -> bool {
        let mut seen = vec![false; table.len()];
        for &v in table {
            let v = v as usize;
            if v >= seen.len() || seen[v] {
                return false;
            }
            seen[v] = true;
        }
        true
    }

    #[test]
    fn test_generated_tables_are_permutations() {
        assert!(is_permutation(&QUICK_257), "QUICK_257 must rank every cell once");
        assert!(is_permutation(&RECT_367_179), "RECT_367_179 must rank every cell once");
    }

    #[test]
    fn test_aspect_selection() {
        assert_eq!(ThresholdTable::for_aspect(1, 1), ThresholdTable::Square257);
        assert_eq!(ThresholdTable::for_aspect(1, 2), ThresholdTable::Rect367x179);
        assert_eq!(ThresholdTable::for_aspect(2, 1), ThresholdTable::Rect179x367);
        // 720x1440 is 1:2, 1440x720 is 2:1
        assert_eq!(ThresholdTable::for_aspect(720, 1440), ThresholdTable::Rect367x179);
        assert_eq!(ThresholdTable::for_aspect(1440, 720), ThresholdTable::Rect179x367);
        // 3:1 truncates to 3, not a rectangular match
        assert_eq!(ThresholdTable::for_aspect(1, 3), ThresholdTable::Square257);
    }

    #[test]
    fn test_build_dimensions() {
        let rect = ThresholdTable::Rect179x367.build().unwrap();
        assert_eq!((rect.width(), rect.height()), (179, 367));
        let fast = ThresholdTable::Iterated64.build().unwrap();
        assert_eq!((fast.width(), fast.height()), (64, 64));
        assert_eq!(fast.exponent(), FAST_STEPS);
    }
}
