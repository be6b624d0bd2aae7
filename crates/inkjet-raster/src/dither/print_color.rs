//! Per-pixel dot selection.

use rand::Rng;

use crate::channel::Channel;
use crate::matrix::{MatrixArena, MatrixCursor};
use crate::output::DitheredRow;

use super::options::DerivedScalars;
use super::ranges::DitherColor;
use super::DitherAlgorithm;

/// How the print threshold is jittered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kernel {
    /// Threshold from the dither matrix, residual carried on.
    Hybrid,
    /// Threshold from two random draws, residual carried on.
    Random,
    /// Threshold from the dither matrix, no residual.
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mode {
    pub kernel: Kernel,
    pub adaptive: bool,
}

impl Mode {
    pub const ORDERED: Mode = Mode {
        kernel: Kernel::Ordered,
        adaptive: false,
    };
}

impl From<DitherAlgorithm> for Mode {
    fn from(algorithm: DitherAlgorithm) -> Self {
        let kernel = match algorithm {
            DitherAlgorithm::HybridFloyd | DitherAlgorithm::AdaptiveHybrid => Kernel::Hybrid,
            DitherAlgorithm::RandomFloyd | DitherAlgorithm::AdaptiveRandom => Kernel::Random,
            DitherAlgorithm::Ordered | DitherAlgorithm::Fast | DitherAlgorithm::VeryFast => {
                Kernel::Ordered
            }
        };
        Mode {
            kernel,
            adaptive: algorithm.is_adaptive(),
        }
    }
}

/// Everything one channel needs to place a dot.
pub(crate) struct ChannelDither<'a> {
    pub channel: Channel,
    pub color: &'a DitherColor,
    pub dither: &'a mut MatrixCursor,
    pub pick: &'a mut MatrixCursor,
    pub arena: &'a MatrixArena,
}

/// Inputs of one dot decision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dot {
    /// Original input, used for the randomizer cutoff and the adaptive switch.
    pub base: i32,
    /// Value selecting the ink segment.
    pub density: i32,
    /// Input plus carried error.
    pub adjusted: i32,
    pub randomizer: u32,
    /// Dots no darker than this are suppressed (black already printed).
    pub dontprint: i32,
}

/// Decide whether pixel `x` gets a dot and which ink, lay the bits into
/// `out` and return the residual.
#[allow(clippy::too_many_arguments)]
pub(crate) fn print_color<R: Rng>(
    scalars: &DerivedScalars,
    ch: &mut ChannelDither<'_>,
    dot: Dot,
    x: usize,
    mode: Mode,
    ink_budget: &mut i32,
    out: &mut DitheredRow,
    rng: &mut R,
) -> i32 {
    let Dot {
        base,
        density,
        adjusted,
        mut randomizer,
        dontprint,
    } = dot;

    if (adjusted <= 0 && !mode.adaptive) || base <= 0 || density <= 0 {
        return adjusted;
    }
    let density = density.min(65536) as u32;

    let Some(seg) = ch
        .color
        .segments()
        .iter()
        .rev()
        .find(|seg| density > seg.range_l)
    else {
        return adjusted;
    };

    let mut kernel = mode.kernel;
    let mut dither_value = adjusted as i64;
    if mode.adaptive {
        if base <= scalars.adaptive_limit {
            kernel = Kernel::Ordered;
            dither_value = base as i64;
        } else if adjusted <= 0 {
            return adjusted;
        }
    }

    let rangepoint: u32 =
        if seg.range_span == 0 || (seg.value_span == 0 && seg.is_dark_l == seg.is_dark_h) {
            32768
        } else {
            ((density - seg.range_l) as u64 * 65536 / seg.range_span as u64) as u32
        };

    let virtual_value: u64 = if seg.value_span == 0 {
        seg.value_h as u64
    } else if seg.range_span == 0 {
        (seg.value_h as u64 + seg.value_l as u64) / 2
    } else if seg.value_h == 65536 && rangepoint == 65536 {
        65536
    } else {
        seg.value_l as u64 + seg.value_span as u64 * rangepoint as u64 / 65536
    };

    // Less jitter in the midtones
    if kernel != Kernel::Ordered {
        if randomizer > 0 {
            if base > scalars.d_cutoff {
                randomizer = 0;
            } else if base > scalars.d_cutoff / 2 {
                randomizer = (randomizer as i64 * 2 * (scalars.d_cutoff - base) as i64
                    / scalars.d_cutoff as i64) as u32;
            }
        }
    } else {
        randomizer = 65536;
    }

    let vmatrix: u64 = if randomizer == 0 {
        virtual_value / 2
    } else {
        let raw: u64 = match kernel {
            Kernel::Random => {
                let a = (rng.gen::<u32>() >> 1) & 0xffff000;
                let b = (rng.gen::<u32>() >> 1) & 0xffff000;
                ((a + b) >> 13) as u64
            }
            Kernel::Hybrid | Kernel::Ordered => ch.dither.value_at(ch.arena, x) as u64,
        };
        if raw == 65536 && virtual_value == 65536 {
            65536
        } else {
            let mut vmatrix = raw * virtual_value / 65536;
            if randomizer != 65536 {
                let vbase = virtual_value * (65536 - randomizer as u64) / 131072;
                vmatrix = vmatrix * randomizer as u64 / 65536 + vbase;
            }
            vmatrix
        }
    };

    if dither_value < vmatrix as i64 {
        return adjusted;
    }

    let take_high = (seg.is_dark_h == seg.is_dark_l && seg.bits_h == seg.bits_l)
        || rangepoint >= ch.pick.value_at(ch.arena, x);
    let (is_dark, bits, value, dot_size) = if take_high {
        (seg.is_dark_h, seg.bits_h, seg.value_h, seg.dot_size_h)
    } else {
        (seg.is_dark_l, seg.bits_l, seg.value_l, seg.dot_size_l)
    };

    if (dontprint as i64) < value as i64 && *ink_budget >= dot_size as i32 {
        let target = if is_dark {
            Some(ch.channel)
        } else {
            ch.channel.light()
        };
        if let Some(target) = target {
            out.line_mut(target).set_bits(x, bits);
        }
        *ink_budget -= dot_size as i32;
    }

    if kernel == Kernel::Ordered {
        -((2 * value / 4) as i32)
    } else {
        adjusted - value as i32
    }
}

/// Single-comparison dot decision of the fast algorithms.
///
/// `very_fast` channels (one dark one-bit level) compare straight against
/// the matrix; others scale the matrix by the segment's upper ink value.
pub(crate) fn print_color_fast(
    ch: &mut ChannelDither<'_>,
    base: i32,
    adjusted: i32,
    x: usize,
    very_fast: bool,
    out: &mut DitheredRow,
) {
    if adjusted <= 0 || base <= 0 {
        return;
    }
    if very_fast {
        if adjusted as u32 >= ch.dither.value_at_fast(ch.arena, x) {
            out.line_mut(ch.channel).set_bits(x, 1);
        }
        return;
    }

    let Some(seg) = ch
        .color
        .segments()
        .iter()
        .rev()
        .find(|seg| base as u32 > seg.range_l)
    else {
        return;
    };
    let vmatrix = (seg.value_h as u64 * ch.dither.value_at_fast(ch.arena, x) as u64) >> 16;
    if adjusted as u64 >= vmatrix {
        let target = if seg.is_dark_h {
            Some(ch.channel)
        } else {
            ch.channel.light()
        };
        if let Some(target) = target {
            out.line_mut(target).set_bits(x, seg.bits_h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelMap, InkSet};
    use crate::dither::options::DitherOptions;
    use crate::matrix::DitherMatrix;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        arena: MatrixArena,
        dither: MatrixCursor,
        pick: MatrixCursor,
        scalars: DerivedScalars,
        rng: StdRng,
    }

    fn fixture(thresholds: &[u32; 4]) -> Fixture {
        let mut arena = MatrixArena::new();
        let id = arena.insert(DitherMatrix::from_table(2, 2, thresholds, false).unwrap());
        let mut dither = arena.clone_submatrix(id, 0, 0);
        let mut pick = arena.clone_submatrix(id, 0, 0);
        dither.set_row(0);
        pick.set_row(0);
        Fixture {
            arena,
            dither,
            pick,
            scalars: DerivedScalars::new(&DitherOptions::default()),
            rng: StdRng::seed_from_u64(3),
        }
    }

    fn row(ink_set: InkSet, planes: u32) -> DitheredRow {
        DitheredRow::new(8, ink_set, &ChannelMap::from_fn(|_| planes))
    }

    fn ordered_dot(value: i32) -> Dot {
        Dot {
            base: value,
            density: value,
            adjusted: value,
            randomizer: 0,
            dontprint: 0,
        }
    }

    #[test]
    fn test_ordered_threshold_and_residual() {
        // ranks 0..4 scale to 0, 16384, 32768, 49152
        let mut f = fixture(&[0, 1, 2, 3]);
        let color = DitherColor::default();
        let mut out = row(InkSet::Monochrome, 1);
        let mut budget = i32::MAX;
        let mut ch = ChannelDither {
            channel: Channel::K,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };

        let residual = print_color(&f.scalars, &mut ch, ordered_dot(20000), 1, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert_eq!(residual, -32768, "ordered print leaves -(value/2)");
        let residual = print_color(&f.scalars, &mut ch, ordered_dot(20000), 0, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert_eq!(residual, -32768);
        assert_eq!(out.line(Channel::K).unwrap().plane(0)[0], 0xC0);

        let mut out = row(InkSet::Monochrome, 1);
        let residual = print_color(&f.scalars, &mut ch, ordered_dot(10000), 1, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert_eq!(residual, 10000, "below threshold keeps the input");
        assert!(out.is_blank());
    }

    #[test]
    fn test_zero_input_is_skipped() {
        let mut f = fixture(&[0, 1, 2, 3]);
        let color = DitherColor::default();
        let mut out = row(InkSet::Monochrome, 1);
        let mut budget = i32::MAX;
        let mut ch = ChannelDither {
            channel: Channel::K,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };
        let dot = Dot {
            base: 0,
            ..ordered_dot(40000)
        };
        assert_eq!(print_color(&f.scalars, &mut ch, dot, 0, Mode::ORDERED, &mut budget, &mut out, &mut f.rng), 40000);
        assert!(out.is_blank());
    }

    #[test]
    fn test_diffusion_without_randomizer_uses_half_value() {
        let mut f = fixture(&[0, 1, 2, 3]);
        let color = DitherColor::default();
        let mut out = row(InkSet::Monochrome, 1);
        let mut budget = i32::MAX;
        let mut ch = ChannelDither {
            channel: Channel::K,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };
        let mode = Mode {
            kernel: Kernel::Hybrid,
            adaptive: false,
        };
        let dot = Dot {
            base: 30000,
            density: 30000,
            adjusted: 32768,
            randomizer: 0,
            dontprint: 0,
        };
        assert_eq!(print_color(&f.scalars, &mut ch, dot, 0, mode, &mut budget, &mut out, &mut f.rng), 32768 - 65536);
        let dot = Dot { adjusted: 32767, ..dot };
        assert_eq!(print_color(&f.scalars, &mut ch, dot, 1, mode, &mut budget, &mut out, &mut f.rng), 32767);
        assert_eq!(out.line(Channel::K).unwrap().pixel(0), 1);
        assert_eq!(out.line(Channel::K).unwrap().pixel(1), 0);
    }

    #[test]
    fn test_light_ink_goes_to_light_plane() {
        let mut f = fixture(&[3, 3, 3, 3]);
        let color = DitherColor::with_light_ink(0.5, 1.0).unwrap();
        let mut out = row(InkSet::SixColor, 1);
        let mut budget = i32::MAX;
        let mut ch = ChannelDither {
            channel: Channel::C,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };
        // 16000 sits in the light segment [0, 32768)
        let dot = Dot {
            base: 16000,
            density: 16000,
            adjusted: 60000,
            randomizer: 0,
            dontprint: 0,
        };
        print_color(&f.scalars, &mut ch, dot, 2, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert_eq!(out.line(Channel::LightC).unwrap().pixel(2), 1);
        assert!(out.line(Channel::C).unwrap().is_blank());
    }

    #[test]
    fn test_budget_and_dontprint_suppress_dots() {
        let mut f = fixture(&[0, 0, 0, 0]);
        let color = DitherColor::default();
        let mut out = row(InkSet::FourColor, 1);
        let mut ch = ChannelDither {
            channel: Channel::M,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };

        let mut budget = 0;
        let residual = print_color(&f.scalars, &mut ch, ordered_dot(50000), 0, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert_eq!(residual, -32768, "residual is charged even when suppressed");
        assert!(out.is_blank());

        let mut budget = i32::MAX;
        let dot = Dot {
            dontprint: 65536,
            ..ordered_dot(50000)
        };
        print_color(&f.scalars, &mut ch, dot, 0, Mode::ORDERED, &mut budget, &mut out, &mut f.rng);
        assert!(out.is_blank());
        assert_eq!(budget, i32::MAX);
    }

    #[test]
    fn test_fast_paths() {
        let mut f = fixture(&[0, 1, 2, 3]);
        let color = DitherColor::from_levels(&[0.5, 1.0], 1.0).unwrap();
        let mut out = row(InkSet::FourColor, 2);
        let mut ch = ChannelDither {
            channel: Channel::Y,
            color: &color,
            dither: &mut f.dither,
            pick: &mut f.pick,
            arena: &f.arena,
        };
        // top segment prints bits_h = 2, threshold 16384 * 65536 >> 16
        print_color_fast(&mut ch, 60000, 20000, 1, false, &mut out);
        assert_eq!(out.line(Channel::Y).unwrap().pixel(1), 2);
        print_color_fast(&mut ch, 60000, 0, 0, false, &mut out);
        assert_eq!(out.line(Channel::Y).unwrap().pixel(0), 0);
        print_color_fast(&mut ch, 1, 1, 0, true, &mut out);
        assert_eq!(out.line(Channel::Y).unwrap().pixel(0), 1);
    }
}
