//! Ink range tables.
//!
//! A channel's intensity axis `0..65536` is split into contiguous
//! segments. Each segment sits between two inks (a light and a dark ink,
//! or two dot sizes of the same ink) and the dither picks one of the two
//! for every printed dot according to where the input falls in the segment.

use super::DitherError;

/// One ink level given by the printer driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleDitherRange {
    /// Relative darkness of a dot of this ink, 1.0 for full dark ink.
    pub value: f64,
    /// Bits laid into the output planes for this ink.
    pub bit_pattern: u32,
    pub is_dark: bool,
    /// Ink cost charged against the per-pixel ink budget.
    pub dot_size: u32,
}

impl SimpleDitherRange {
    pub const fn dark(value: f64, bit_pattern: u32, dot_size: u32) -> Self {
        Self {
            value,
            bit_pattern,
            is_dark: true,
            dot_size,
        }
    }
}

/// An explicit low/high ink pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullDitherRange {
    pub value_l: f64,
    pub value_h: f64,
    pub bits_l: u32,
    pub bits_h: u32,
    pub is_dark_l: bool,
    pub is_dark_h: bool,
}

/// One interval of the intensity axis together with the inks bounding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DitherSegment {
    pub range_l: u32,
    pub range_h: u32,
    pub value_l: u32,
    pub value_h: u32,
    pub bits_l: u32,
    pub bits_h: u32,
    pub is_dark_l: bool,
    pub is_dark_h: bool,
    pub dot_size_l: u32,
    pub dot_size_h: u32,
    pub range_span: u32,
    pub value_span: u32,
}

impl DitherSegment {
    /// A segment whose low side continues where `prev` ended.
    fn following(prev: &DitherSegment) -> Self {
        Self {
            range_l: prev.range_h,
            value_l: prev.value_h,
            bits_l: prev.bits_h,
            is_dark_l: prev.is_dark_h,
            dot_size_l: prev.dot_size_h,
            ..Default::default()
        }
    }

    fn update_spans(&mut self) {
        self.range_span = self.range_h - self.range_l;
        self.value_span = self.value_h.saturating_sub(self.value_l);
    }
}

/// The complete range table of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherColor {
    segments: Vec<DitherSegment>,
    bit_max: u32,
    signif_bits: u32,
}

impl Default for DitherColor {
    /// One dark, one-bit ink covering the whole axis.
    fn default() -> Self {
        let seg = DitherSegment {
            range_l: 0,
            range_h: 65536,
            value_l: 65536,
            value_h: 65536,
            bits_l: 1,
            bits_h: 1,
            is_dark_l: true,
            is_dark_h: true,
            dot_size_l: 1,
            dot_size_h: 1,
            range_span: 65536,
            value_span: 0,
        };
        Self::with_segments(vec![seg], 1)
    }
}

fn check_value(name: &'static str, value: f64) -> Result<(), DitherError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DitherError::InvalidParameter { name, value })
    }
}

#[inline]
fn scale_capped(value: f64) -> u32 {
    (value as u32).min(65536)
}

impl DitherColor {
    /// Build segments from an ascending list of ink levels.
    ///
    /// With one level the single segment spans the whole axis. With more,
    /// level `l` ends at `value_l * density`, and a final segment repeating
    /// the darkest ink runs to the top.
    pub fn from_simple(ranges: &[SimpleDitherRange], density: f64) -> Result<Self, DitherError> {
        let first = ranges.first().ok_or(DitherError::EmptyInkRange)?;
        check_value("density", density)?;
        for r in ranges {
            check_value("range value", r.value)?;
        }

        let mut segments = Vec::with_capacity(ranges.len() + 1);
        let mut bit_max = first.bit_pattern;

        let mut seg = DitherSegment {
            range_l: 0,
            value_l: scale_capped(first.value * 65536.0),
            bits_l: first.bit_pattern,
            is_dark_l: first.is_dark,
            dot_size_l: first.dot_size,
            range_h: if ranges.len() == 1 {
                65536
            } else {
                scale_capped(first.value * 65536.0 * density)
            },
            value_h: scale_capped(first.value * 65536.0),
            bits_h: first.bit_pattern,
            is_dark_h: first.is_dark,
            dot_size_h: first.dot_size,
            ..Default::default()
        };
        seg.range_span = seg.range_h;
        seg.value_span = 0;
        segments.push(seg);

        if ranges.len() > 1 {
            for r in &ranges[1..] {
                let prev = segments[segments.len() - 1];
                let mut seg = DitherSegment::following(&prev);
                seg.range_h = scale_capped(r.value * 65536.0 * density).max(seg.range_l);
                seg.value_h = scale_capped(r.value * 65536.0);
                seg.bits_h = r.bit_pattern;
                seg.is_dark_h = r.is_dark;
                seg.dot_size_h = r.dot_size;
                seg.update_spans();
                bit_max = bit_max.max(r.bit_pattern);
                segments.push(seg);
            }

            let prev = segments[segments.len() - 1];
            let mut top = DitherSegment::following(&prev);
            top.range_h = 65536;
            top.value_h = top.value_l;
            top.bits_h = top.bits_l;
            top.is_dark_h = top.is_dark_l;
            top.dot_size_h = top.dot_size_l;
            top.update_spans();
            segments.push(top);
        }

        Ok(Self::with_segments(segments, bit_max))
    }

    /// Build segments from explicit ink pairs.
    ///
    /// Values are scaled by 65535. Each pair's segment ends at `value_h`
    /// times `density` and starts where the previous one ended, the first
    /// at 0, so the pairs tile the axis. A sentinel repeating the last ink
    /// runs to the top. The bit pattern doubles as the dot size.
    pub fn from_full(ranges: &[FullDitherRange], density: f64) -> Result<Self, DitherError> {
        if ranges.is_empty() {
            return Err(DitherError::EmptyInkRange);
        }
        check_value("density", density)?;

        let mut segments: Vec<DitherSegment> = Vec::with_capacity(ranges.len() + 1);
        let mut bit_max = 0;
        for r in ranges {
            check_value("range value_l", r.value_l)?;
            check_value("range value_h", r.value_h)?;
            if r.value_h < r.value_l {
                return Err(DitherError::InvalidParameter {
                    name: "range value_h",
                    value: r.value_h,
                });
            }
            bit_max = bit_max.max(r.bits_l).max(r.bits_h);

            let value_l = (r.value_l * 65535.0) as u32;
            let value_h = (r.value_h * 65535.0) as u32;
            let range_l = segments.last().map_or(0, |prev| prev.range_h);
            let mut seg = DitherSegment {
                value_l,
                value_h,
                range_l,
                range_h: scale_capped(value_h as f64 * density).max(range_l),
                bits_l: r.bits_l,
                bits_h: r.bits_h,
                is_dark_l: r.is_dark_l,
                is_dark_h: r.is_dark_h,
                dot_size_l: r.bits_l,
                dot_size_h: r.bits_h,
                ..Default::default()
            };
            seg.update_spans();
            segments.push(seg);
        }

        let prev = segments[segments.len() - 1];
        let mut top = DitherSegment::following(&prev);
        top.range_h = 65536;
        top.value_h = top.value_l;
        top.bits_h = top.bits_l;
        top.is_dark_h = top.is_dark_l;
        top.dot_size_h = top.dot_size_l;
        top.update_spans();
        segments.push(top);

        Ok(Self::with_segments(segments, bit_max))
    }

    /// Build segments from plain dot-size levels, all dark ink.
    ///
    /// Level `i` prints bit pattern (and dot size) `i + 1`.
    pub fn from_levels(levels: &[f64], density: f64) -> Result<Self, DitherError> {
        let ranges: Vec<SimpleDitherRange> = levels
            .iter()
            .enumerate()
            .map(|(i, &value)| SimpleDitherRange::dark(value, i as u32 + 1, i as u32 + 1))
            .collect();
        Self::from_simple(&ranges, density)
    }

    /// Light ink at `light_value` below dark ink at full strength.
    pub fn with_light_ink(light_value: f64, density: f64) -> Result<Self, DitherError> {
        let ranges = [
            SimpleDitherRange {
                value: light_value,
                bit_pattern: 1,
                is_dark: false,
                dot_size: 1,
            },
            SimpleDitherRange::dark(1.0, 1, 1),
        ];
        Self::from_simple(&ranges, density)
    }

    fn with_segments(segments: Vec<DitherSegment>, bit_max: u32) -> Self {
        let signif_bits = u32::BITS - bit_max.leading_zeros();
        Self {
            segments,
            bit_max,
            signif_bits,
        }
    }

    #[inline]
    pub fn segments(&self) -> &[DitherSegment] {
        &self.segments
    }

    #[inline]
    pub fn bit_max(&self) -> u32 {
        self.bit_max
    }

    /// Number of bit planes this channel's output needs.
    #[inline]
    pub fn signif_bits(&self) -> u32 {
        self.signif_bits
    }

    /// Whether any segment prints light ink.
    pub fn uses_light_ink(&self) -> bool {
        self.segments.iter().any(|s| !s.is_dark_l || !s.is_dark_h)
    }

    /// Single dark one-bit level: the fast path may skip value scaling.
    pub fn is_single_dark_bit(&self) -> bool {
        match self.segments.as_slice() {
            [only] => only.bits_h == 1 && only.is_dark_h,
            _ => false,
        }
    }
}
