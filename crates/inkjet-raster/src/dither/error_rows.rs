//! Error-diffusion rows.
//!
//! Each diffusing channel keeps two error rows indexed by row parity: the
//! row being dithered reads its carried error from `current` and spreads
//! residuals into `next` (and, ahead of the scan, into `current`). Rows are
//! padded by [`MAX_SPREAD`] on both sides so the spread never needs bounds
//! checks.

use rand::Rng;

use crate::channel::Channel;

/// Widest sideways spread of one residual, in pixels.
pub const MAX_SPREAD: usize = 32;

/// Share of a residual pushed to the next row.
const NEXT_SPREAD: i32 = 4;
/// Share of a residual pushed ahead along the current row.
const THIS_SPREAD: i32 = 8 - NEXT_SPREAD;

/// Horizontal scan direction of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    LeftToRight,
    RightToLeft,
}

impl ScanDirection {
    /// Serpentine order: even rows run left to right.
    #[inline]
    pub fn for_row(row: usize) -> Self {
        if row % 2 == 0 {
            ScanDirection::LeftToRight
        } else {
            ScanDirection::RightToLeft
        }
    }

    #[inline]
    pub fn step(self) -> isize {
        match self {
            ScanDirection::LeftToRight => 1,
            ScanDirection::RightToLeft => -1,
        }
    }
}

/// Lookup tables for the triangular spread kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadTables {
    spread: u32,
    offset0: Vec<i32>,
    offset1: Vec<i32>,
}

impl SpreadTables {
    /// `spread >= 16` turns sideways spreading off entirely.
    pub fn new(spread: u32) -> Self {
        if spread >= 16 {
            return Self {
                spread: 16,
                offset0: Vec::new(),
                offset1: Vec::new(),
            };
        }
        let max_offset = (1usize << (16 - spread)) + 1;
        let offset0 = (0..max_offset).map(|i| ((i + 1) * (i + 1)) as i32).collect();
        let offset1 = (0..max_offset).map(|i| ((i + 1) * i / 2) as i32).collect();
        Self {
            spread,
            offset0,
            offset1,
        }
    }

    #[inline]
    pub fn spread(&self) -> u32 {
        self.spread
    }

    #[inline]
    fn mask(&self) -> i32 {
        (1i32 << self.spread) - 1
    }
}

impl Default for SpreadTables {
    fn default() -> Self {
        Self::new(13)
    }
}

/// Add carried error to an input value (error is kept 8x scaled).
#[inline]
pub fn apply_error(value: i32, error: i32) -> i32 {
    if error >= 0 {
        value.saturating_add(error >> 3)
    } else {
        value.saturating_sub(error.saturating_neg() >> 3)
    }
}

/// Two error rows for every channel that diffuses (K, C, M, Y).
#[derive(Debug, Clone)]
pub struct ErrorRows {
    width: usize,
    rows: [[Vec<i32>; 2]; 4],
}

#[inline]
fn slot(channel: Channel) -> usize {
    match channel {
        Channel::LightC => Channel::C.index(),
        Channel::LightM => Channel::M.index(),
        other => other.index(),
    }
}

impl ErrorRows {
    pub fn new(width: usize) -> Self {
        let len = width + 2 * MAX_SPREAD;
        Self {
            width,
            rows: std::array::from_fn(|_| [vec![0; len], vec![0; len]]),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Borrow the current and next rows of `channel` for output row `row`.
    pub fn line(&mut self, channel: Channel, row: usize) -> ErrorLine<'_> {
        ErrorLine::split(&mut self.rows[slot(channel)], row)
    }

    /// The C, M and Y lines of row `row` at once.
    pub fn color_lines(&mut self, row: usize) -> [ErrorLine<'_>; 3] {
        let [_, c, m, y] = &mut self.rows;
        [
            ErrorLine::split(c, row),
            ErrorLine::split(m, row),
            ErrorLine::split(y, row),
        ]
    }

    /// Zero the next rows of every channel.
    pub fn clear_all_next(&mut self, row: usize) {
        for pair in &mut self.rows {
            pair[(row + 1) % 2].fill(0);
        }
    }

    /// Zero the current rows of every channel.
    pub fn clear_all_current(&mut self, row: usize) {
        for pair in &mut self.rows {
            pair[row % 2].fill(0);
        }
    }

    pub fn clear_next(&mut self, channel: Channel, row: usize) {
        self.rows[slot(channel)][(row + 1) % 2].fill(0);
    }

    pub fn clear_current(&mut self, channel: Channel, row: usize) {
        self.rows[slot(channel)][row % 2].fill(0);
    }

    /// Carried error at pixel `x` of row `row`.
    pub fn carried(&self, channel: Channel, row: usize, x: usize) -> i32 {
        self.rows[slot(channel)][row % 2][x + MAX_SPREAD]
    }
}

/// The pair of error rows one channel uses while dithering a scanline.
#[derive(Debug)]
pub struct ErrorLine<'a> {
    current: &'a mut [i32],
    next: &'a mut [i32],
}

impl<'a> ErrorLine<'a> {
    fn split(pair: &'a mut [Vec<i32>; 2], row: usize) -> Self {
        let [even, odd] = pair;
        if row % 2 == 0 {
            ErrorLine {
                current: even.as_mut_slice(),
                next: odd.as_mut_slice(),
            }
        } else {
            ErrorLine {
                current: odd.as_mut_slice(),
                next: even.as_mut_slice(),
            }
        }
    }

    /// Carried error at pixel `x`.
    #[inline]
    pub fn carried(&self, x: usize) -> i32 {
        self.current[x + MAX_SPREAD]
    }

    /// Spread the residual `residual` left at pixel `x`, whose original
    /// input was `original`, and return the error carried into the next
    /// pixel in scan direction.
    ///
    /// Light input spreads wider: the kernel radius grows as `original`
    /// falls, rounded stochastically with `rng`, and is capped at
    /// `MAX_SPREAD - 1`.
    pub fn diffuse<R: Rng>(
        &mut self,
        x: usize,
        direction: ScanDirection,
        residual: i32,
        original: i32,
        tables: &SpreadTables,
        rng: &mut R,
    ) -> i32 {
        let pos = x + MAX_SPREAD;
        let dir = direction.step();
        let ahead = pos.wrapping_add_signed(dir);

        if residual == 0 {
            return self.current[ahead];
        }
        let tmp = residual.clamp(-65535, 65535);

        let offset = if tables.spread >= 16 || original >= 2048 {
            0
        } else {
            let tmpo = original.max(0) * 32;
            let mask = tables.mask();
            let mut offset = (65535 - (tmpo & 0xffff)) >> tables.spread;
            if (rng.gen::<u32>() as i32 & mask) > (tmpo & mask) {
                offset += 1;
            }
            offset.min(MAX_SPREAD as i32 - 1)
        };

        if offset == 0 {
            self.next[pos] = self.next[pos].saturating_add(NEXT_SPREAD * tmp);
            return self.current[ahead].saturating_add(THIS_SPREAD * tmp);
        }

        let off = offset as usize;
        let dist = NEXT_SPREAD * tmp / tables.offset0[off];
        let dist1 = THIS_SPREAD * tmp / tables.offset1[off];
        let mut delta = dist;
        let mut delta1 = dist1 * offset;

        for i in -offset..=offset {
            let at = pos.wrapping_add_signed(i as isize);
            self.next[at] = self.next[at].saturating_add(delta);
            if (i > 0 && dir > 0) || (i < 0 && dir < 0) {
                self.current[at] = self.current[at].saturating_add(delta1);
                delta1 -= dist1;
            }
            if i < 0 {
                delta += dist;
            } else {
                delta -= dist;
            }
        }
        self.current[ahead]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_spread_tables() {
        let t = SpreadTables::new(13);
        assert_eq!(t.spread(), 13);
        assert_eq!(t.offset0.len(), 9);
        assert_eq!(&t.offset0[..4], &[1, 4, 9, 16]);
        assert_eq!(&t.offset1[..4], &[0, 1, 3, 6]);

        let off = SpreadTables::new(20);
        assert_eq!(off.spread(), 16);
        assert!(off.offset0.is_empty());
    }

    #[test]
    fn test_apply_error_rounds_toward_zero() {
        assert_eq!(apply_error(100, 16), 102);
        assert_eq!(apply_error(100, -16), 98);
        assert_eq!(apply_error(100, 7), 100);
        assert_eq!(apply_error(100, -7), 100);
        assert_eq!(apply_error(100, -9), 99);
    }

    #[test]
    fn test_diffuse_without_spread() {
        let mut rows = ErrorRows::new(8);
        let tables = SpreadTables::new(16);
        let mut rng = StdRng::seed_from_u64(1);

        let mut line = rows.line(Channel::K, 0);
        let carried = line.diffuse(3, ScanDirection::LeftToRight, 1000, 100, &tables, &mut rng);
        assert_eq!(carried, 4000, "this-row share goes to the next pixel");
        drop(line);

        assert_eq!(rows.carried(Channel::K, 1, 3), 4000, "next-row share lands below");
        assert_eq!(rows.carried(Channel::K, 1, 2), 0);
    }

    #[test]
    fn test_diffuse_spreads_light_input_wider() {
        let mut rows = ErrorRows::new(64);
        let tables = SpreadTables::new(13);
        let mut rng = StdRng::seed_from_u64(7);

        let mut line = rows.line(Channel::C, 0);
        line.diffuse(32, ScanDirection::LeftToRight, 1000, 0, &tables, &mut rng);
        drop(line);

        // original 0 gives offset 7 or 8: the next row gets a triangle
        let below: Vec<i32> = (20..45).map(|x| rows.carried(Channel::C, 1, x)).collect();
        let touched = below.iter().filter(|&&v| v != 0).count();
        assert!(touched >= 13, "expected a wide kernel, got {:?}", below);
        assert!(rows.carried(Channel::C, 1, 32) >= rows.carried(Channel::C, 1, 30));
    }

    #[test]
    fn test_diffuse_zero_residual_reads_ahead() {
        let mut rows = ErrorRows::new(8);
        let tables = SpreadTables::default();
        let mut rng = StdRng::seed_from_u64(1);
        {
            let mut line = rows.line(Channel::M, 2);
            line.current[MAX_SPREAD + 4] = 77;
            let carried = line.diffuse(5, ScanDirection::RightToLeft, 0, 0, &tables, &mut rng);
            assert_eq!(carried, 77);
        }
        rows.clear_current(Channel::M, 2);
        assert_eq!(rows.carried(Channel::M, 2, 4), 0);
    }

    #[test]
    fn test_large_residual_is_clamped() {
        let mut rows = ErrorRows::new(4);
        let tables = SpreadTables::new(16);
        let mut rng = StdRng::seed_from_u64(1);
        let mut line = rows.line(Channel::Y, 0);
        for _ in 0..100_000 {
            line.diffuse(1, ScanDirection::LeftToRight, i32::MAX, 0, &tables, &mut rng);
        }
        drop(line);
        assert_eq!(rows.carried(Channel::Y, 1, 1), i32::MAX, "accumulation saturates");
    }

    #[test]
    fn test_light_channels_share_dark_rows() {
        let mut rows = ErrorRows::new(4);
        rows.line(Channel::LightC, 0).current[MAX_SPREAD] = 5;
        assert_eq!(rows.carried(Channel::C, 0, 0), 5);
    }
}
