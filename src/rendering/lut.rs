//! Tone curve applied to 16-bit source samples before separation.

/// 65536-entry lookup table over source intensity (`65535` is white).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneLut {
    table: Vec<u16>,
}

impl ToneLut {
    /// Build the curve from `brightness`, `contrast` and `gamma`, all
    /// neutral at `1.0`.
    ///
    /// Contrast stretches around mid gray, brightness scales the result and
    /// gamma bends it (`x^(1/gamma)`, so values above 1 lighten midtones).
    pub fn compute(brightness: f64, contrast: f64, gamma: f64) -> Self {
        let inverse_gamma = 1.0 / gamma;
        let table = (0..=u16::MAX as u32)
            .map(|i| {
                let x = i as f64 / 65535.0;
                let x = ((x - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
                let x = (x * brightness).clamp(0.0, 1.0);
                let x = x.powf(inverse_gamma);
                (x * 65535.0 + 0.5) as u16
            })
            .collect();
        Self { table }
    }

    pub fn identity() -> Self {
        Self {
            table: (0..=u16::MAX).collect(),
        }
    }

    #[inline]
    pub fn apply(&self, value: u16) -> u16 {
        self.table[value as usize]
    }

    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(i, &v)| i == v as usize)
    }
}

impl Default for ToneLut {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_curve_is_identity() {
        let lut = ToneLut::compute(1.0, 1.0, 1.0);
        assert!(lut.is_identity(), "neutral settings must not change samples");
        assert_eq!(lut, ToneLut::identity());
    }

    #[test]
    fn test_endpoints_fixed_by_gamma() {
        let lut = ToneLut::compute(1.0, 1.0, 2.2);
        assert_eq!(lut.apply(0), 0);
        assert_eq!(lut.apply(u16::MAX), u16::MAX);
        assert!(lut.apply(32768) > 32768, "gamma above 1 lightens midtones");
    }

    #[test]
    fn test_curve_is_monotonic() {
        let lut = ToneLut::compute(1.1, 1.3, 0.8);
        let mut previous = 0;
        for v in (0..=u16::MAX).step_by(97) {
            let out = lut.apply(v);
            assert!(out >= previous, "curve decreased at {v}");
            previous = out;
        }
    }

    #[test]
    fn test_brightness_darkens_below_one() {
        let lut = ToneLut::compute(0.5, 1.0, 1.0);
        assert_eq!(lut.apply(u16::MAX), 32768);
        assert_eq!(lut.apply(0), 0);
    }

    #[test]
    fn test_contrast_pivots_on_mid_gray() {
        let lut = ToneLut::compute(1.0, 2.0, 1.0);
        assert_eq!(lut.apply(16383), 0, "quarter gray is pushed to black");
        assert_eq!(lut.apply(49151), u16::MAX);
    }
}
