//! Deterministic RGB test images.

use crate::models::{ImageConfig, Pattern};

/// One 16-bit RGB sample; `[65535; 3]` is white.
pub type Rgb16 = [u16; 3];

const WHITE: Rgb16 = [u16::MAX; 3];
const BLACK: Rgb16 = [0; 3];
const CHECKER_CELL: usize = 16;
const STEPS: usize = 11;

/// SMPTE-style bar order.
const BARS: [Rgb16; 8] = [
    WHITE,
    [u16::MAX, u16::MAX, 0],
    [0, u16::MAX, u16::MAX],
    [0, u16::MAX, 0],
    [u16::MAX, 0, u16::MAX],
    [u16::MAX, 0, 0],
    [0, 0, u16::MAX],
    BLACK,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestChart {
    pattern: Pattern,
    width: usize,
    height: usize,
    level: f64,
}

/// Ink amount growing linearly from `0` at the first column to full at the
/// last.
fn ink_ramp(x: usize, width: usize) -> u16 {
    let span = width.saturating_sub(1).max(1) as u64;
    (x as u64 * u16::MAX as u64 / span) as u16
}

impl TestChart {
    pub fn new(pattern: Pattern, width: usize, height: usize, level: f64) -> Self {
        Self {
            pattern,
            width,
            height,
            level: level.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(image: &ImageConfig) -> Self {
        Self::new(image.pattern, image.width, image.height, image.level)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Fill `out` with image row `y`. `out` must hold `width` samples.
    pub fn fill_row(&self, y: usize, out: &mut [Rgb16]) {
        debug_assert_eq!(out.len(), self.width);
        let width = self.width;
        match self.pattern {
            Pattern::Gradient => {
                for (x, px) in out.iter_mut().enumerate() {
                    *px = [u16::MAX - ink_ramp(x, width); 3];
                }
            }
            Pattern::Ramp => {
                // Cyan, magenta, yellow and gray bands from top to bottom.
                let band = (y * 4 / self.height.max(1)).min(3);
                for (x, px) in out.iter_mut().enumerate() {
                    let v = u16::MAX - ink_ramp(x, width);
                    *px = match band {
                        0 => [v, u16::MAX, u16::MAX],
                        1 => [u16::MAX, v, u16::MAX],
                        2 => [u16::MAX, u16::MAX, v],
                        _ => [v; 3],
                    };
                }
            }
            Pattern::Steps => {
                for (x, px) in out.iter_mut().enumerate() {
                    let step = (x * STEPS / width).min(STEPS - 1);
                    let ink = (step as u64 * u16::MAX as u64 / (STEPS as u64 - 1)) as u16;
                    *px = [u16::MAX - ink; 3];
                }
            }
            Pattern::Solid => {
                let ink = (self.level * u16::MAX as f64).round() as u16;
                out.fill([u16::MAX - ink; 3]);
            }
            Pattern::Checker => {
                for (x, px) in out.iter_mut().enumerate() {
                    let dark = (x / CHECKER_CELL + y / CHECKER_CELL) % 2 == 0;
                    *px = if dark { BLACK } else { WHITE };
                }
            }
            Pattern::ColorBars => {
                for (x, px) in out.iter_mut().enumerate() {
                    *px = BARS[(x * BARS.len() / width).min(BARS.len() - 1)];
                }
            }
        }
    }
}
