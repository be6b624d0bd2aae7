//! Source rows to ink rows: tone curve, horizontal resampling and color
//! separation.

use inkjet_raster::RowInput;

use super::lut::ToneLut;
use super::test_chart::{Rgb16, TestChart};

/// Nearest-sample horizontal scaler.
///
/// Walks the source with an integer step and an error term, so every output
/// column maps to `floor(x * src / dst)` without a division per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    src_width: usize,
    dst_width: usize,
    xstep: usize,
    xmod: usize,
}

impl Resampler {
    pub fn new(src_width: usize, dst_width: usize) -> Self {
        let dst = dst_width.max(1);
        Self {
            src_width,
            dst_width,
            xstep: src_width / dst,
            xmod: src_width % dst,
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.src_width == self.dst_width
    }

    pub fn resample<T: Copy>(&self, input: &[T], out: &mut [T]) {
        debug_assert_eq!(input.len(), self.src_width);
        debug_assert_eq!(out.len(), self.dst_width);
        let mut pos = 0;
        let mut xerror = 0;
        for px in out.iter_mut() {
            *px = input[pos];
            pos += self.xstep;
            xerror += self.xmod;
            if xerror >= self.dst_width {
                xerror -= self.dst_width;
                pos += 1;
            }
        }
    }
}

/// Luminance of a sample with integer weights.
#[inline]
fn luminance(px: Rgb16) -> u16 {
    ((px[0] as u32 * 31 + px[1] as u32 * 61 + px[2] as u32 * 8) / 100) as u16
}

/// Produces the ink rows of a test chart, one image row at a time.
#[derive(Debug, Clone)]
pub struct RowSource {
    chart: TestChart,
    lut: ToneLut,
    resampler: Resampler,
    source: Vec<Rgb16>,
    scaled: Vec<Rgb16>,
    c: Vec<u16>,
    m: Vec<u16>,
    y: Vec<u16>,
    k: Vec<u16>,
}

impl RowSource {
    pub fn new(chart: TestChart, lut: ToneLut, output_width: usize) -> Self {
        Self {
            resampler: Resampler::new(chart.width(), output_width),
            source: vec![[u16::MAX; 3]; chart.width()],
            scaled: vec![[u16::MAX; 3]; output_width],
            c: vec![0; output_width],
            m: vec![0; output_width],
            y: vec![0; output_width],
            k: vec![0; output_width],
            chart,
            lut,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.chart.height()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.scaled.len()
    }

    /// Generate image row `y`, correct its tone and separate it into ink
    /// amounts (`65535 - intensity`).
    pub fn load_row(&mut self, y: usize) {
        self.chart.fill_row(y, &mut self.source);
        if self.resampler.is_identity() {
            self.scaled.copy_from_slice(&self.source);
        } else {
            self.resampler.resample(&self.source, &mut self.scaled);
        }

        for (x, px) in self.scaled.iter().enumerate() {
            let px = [
                self.lut.apply(px[0]),
                self.lut.apply(px[1]),
                self.lut.apply(px[2]),
            ];
            self.c[x] = u16::MAX - px[0];
            self.m[x] = u16::MAX - px[1];
            self.y[x] = u16::MAX - px[2];
            self.k[x] = u16::MAX - luminance(px);
        }
    }

    /// Cyan, magenta and yellow of the last loaded row.
    pub fn cmy(&self) -> RowInput<'_> {
        RowInput::Cmy {
            c: &self.c,
            m: &self.m,
            y: &self.y,
        }
    }

    /// Black of the last loaded row.
    #[inline]
    pub fn gray(&self) -> &[u16] {
        &self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pattern;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resample_down_matches_floor() {
        let input: Vec<usize> = (0..10).collect();
        let mut out = vec![0; 4];
        Resampler::new(10, 4).resample(&input, &mut out);
        let expected: Vec<usize> = (0..4).map(|x| x * 10 / 4).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_resample_up_repeats_samples() {
        let input = [1u8, 2, 3];
        let mut out = [0u8; 7];
        Resampler::new(3, 7).resample(&input, &mut out);
        assert_eq!(out, [1, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_separation_inverts_intensity() {
        let chart = TestChart::new(Pattern::ColorBars, 8, 1, 0.5);
        let mut source = RowSource::new(chart, ToneLut::identity(), 8);
        source.load_row(0);
        match source.cmy() {
            RowInput::Cmy { c, m, y } => {
                // yellow bar: no cyan, no magenta, full yellow
                assert_eq!((c[1], m[1], y[1]), (0, 0, u16::MAX));
                // black bar
                assert_eq!((c[7], m[7], y[7]), (u16::MAX, u16::MAX, u16::MAX));
            }
            RowInput::Gray(_) => panic!("Expected CMY input"),
        }
        assert_eq!(source.gray()[0], 0, "white needs no black");
        assert_eq!(source.gray()[7], u16::MAX);
    }

    #[test]
    fn test_output_width_follows_resampler() {
        let chart = TestChart::new(Pattern::Gradient, 100, 2, 0.5);
        let mut source = RowSource::new(chart, ToneLut::identity(), 250);
        source.load_row(1);
        assert_eq!(source.width(), 250);
        assert_eq!(source.gray().len(), 250);
        assert_eq!(source.gray()[0], 0);
        assert_eq!(source.gray()[249], u16::MAX);
    }
}
