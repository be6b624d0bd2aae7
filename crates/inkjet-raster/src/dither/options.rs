//! Tuning values of the dither engine and the integer scalars derived
//! from them.

use super::DitherError;

/// Per-channel randomness of the diffusion threshold, `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Randomizers {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

impl Randomizers {
    pub const fn uniform(value: f64) -> Self {
        Self {
            c: value,
            m: value,
            y: value,
            k: value,
        }
    }
}

impl Default for Randomizers {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// Tuning values. All fractions are relative to full ink coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct DitherOptions {
    /// Overall ink density, clamped to `0.0..=1.0`.
    pub density: f64,
    /// Kernel-width parameter; `>= 16` disables sideways spread.
    pub ink_spread: u32,
    /// Below this gray level no black ink replaces CMY.
    pub black_lower: f64,
    /// Above this gray level black replacement is complete.
    pub black_upper: f64,
    pub randomizers: Randomizers,
    /// Exponent applied to the dot-size pick matrix.
    pub transition: f64,
    /// Adaptive algorithms dither ordered below `density / adaptive_divisor`.
    pub adaptive_divisor: u32,
    /// Ink budget per pixel as `(levels, fraction)`; `None` is unlimited.
    pub max_ink: Option<(u32, f64)>,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            density: 1.0,
            ink_spread: 13,
            black_lower: 0.4,
            black_upper: 0.7,
            randomizers: Randomizers::default(),
            transition: 0.6,
            adaptive_divisor: 2,
            max_ink: None,
        }
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), DitherError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DitherError::InvalidParameter { name, value })
    }
}

impl DitherOptions {
    pub fn validate(&self) -> Result<(), DitherError> {
        if !self.density.is_finite() {
            return Err(DitherError::InvalidParameter {
                name: "density",
                value: self.density,
            });
        }
        check_fraction("black_lower", self.black_lower)?;
        check_fraction("black_upper", self.black_upper)?;
        if self.black_upper < self.black_lower {
            return Err(DitherError::InvalidParameter {
                name: "black_upper",
                value: self.black_upper,
            });
        }
        let r = &self.randomizers;
        check_fraction("randomizer c", r.c)?;
        check_fraction("randomizer m", r.m)?;
        check_fraction("randomizer y", r.y)?;
        check_fraction("randomizer k", r.k)?;
        if !(self.transition.is_finite() && self.transition > 0.0) {
            return Err(DitherError::InvalidParameter {
                name: "transition",
                value: self.transition,
            });
        }
        if self.adaptive_divisor == 0 {
            return Err(DitherError::InvalidParameter {
                name: "adaptive_divisor",
                value: 0.0,
            });
        }
        if let Some((levels, fraction)) = self.max_ink {
            if levels == 0 || !fraction.is_finite() || fraction <= 0.0 {
                return Err(DitherError::InvalidParameter {
                    name: "max_ink",
                    value: fraction,
                });
            }
        }
        Ok(())
    }
}

/// Integer scalars the per-pixel code works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DerivedScalars {
    pub density: i32,
    pub density2: i32,
    pub k_lower: i32,
    pub k_upper: i32,
    pub dlb_range: i32,
    pub bound_range: i32,
    pub d_cutoff: i32,
    pub adaptive_limit: i32,
    pub ink_limit: i32,
    pub c_randomizer: u32,
    pub m_randomizer: u32,
    pub y_randomizer: u32,
    pub k_randomizer: u32,
}

impl DerivedScalars {
    /// Derive from validated options.
    ///
    /// Black bounds are computed from their fractions every time, so
    /// changing the density twice does not compound.
    pub fn new(options: &DitherOptions) -> Self {
        let density_fraction = options.density.clamp(0.0, 1.0);
        let k_lower = ((options.black_lower * 65536.0) as i32 as f64 * density_fraction) as i32;
        let k_upper = ((options.black_upper * 65536.0) as i32 as f64 * density_fraction) as i32;
        let density = (65536.0 * density_fraction + 0.5) as i32;
        let ink_limit = match options.max_ink {
            Some((levels, fraction)) => (fraction * levels as f64 + 0.5).min(i32::MAX as f64) as i32,
            None => i32::MAX,
        };
        let r = &options.randomizers;
        Self {
            density,
            density2: 2 * density,
            k_lower,
            k_upper,
            dlb_range: density - k_lower,
            bound_range: k_upper - k_lower,
            d_cutoff: density / 16,
            adaptive_limit: density / options.adaptive_divisor.max(1) as i32,
            ink_limit,
            c_randomizer: (r.c * 65536.0) as u32,
            m_randomizer: (r.m * 65536.0) as u32,
            y_randomizer: (r.y * 65536.0) as u32,
            k_randomizer: (r.k * 65536.0) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scalars() {
        let s = DerivedScalars::new(&DitherOptions::default());
        assert_eq!(s.density, 65536);
        assert_eq!(s.density2, 131072);
        assert_eq!(s.k_lower, 26214);
        assert_eq!(s.k_upper, 45875);
        assert_eq!(s.dlb_range, 65536 - 26214);
        assert_eq!(s.bound_range, 45875 - 26214);
        assert_eq!(s.d_cutoff, 4096);
        assert_eq!(s.adaptive_limit, 32768);
        assert_eq!(s.ink_limit, i32::MAX);
        assert_eq!(s.k_randomizer, 65536);
    }

    #[test]
    fn test_density_clamps_and_scales_black_bounds() {
        let options = DitherOptions {
            density: 1.7,
            ..Default::default()
        };
        assert_eq!(DerivedScalars::new(&options).density, 65536);

        let half = DitherOptions {
            density: 0.5,
            ..Default::default()
        };
        let s = DerivedScalars::new(&half);
        assert_eq!(s.density, 32768);
        assert_eq!(s.k_lower, 13107);
        assert_eq!(s.adaptive_limit, 16384);
    }

    #[test]
    fn test_max_ink_rounds() {
        let options = DitherOptions {
            max_ink: Some((3, 0.5)),
            ..Default::default()
        };
        assert_eq!(DerivedScalars::new(&options).ink_limit, 2);
    }

    #[test]
    fn test_validate() {
        assert!(DitherOptions::default().validate().is_ok());
        let bad = DitherOptions {
            black_lower: 0.8,
            black_upper: 0.2,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(DitherError::InvalidParameter { name: "black_upper", .. })
        ));
        let bad = DitherOptions {
            randomizers: Randomizers::uniform(1.5),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = DitherOptions {
            adaptive_divisor: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
