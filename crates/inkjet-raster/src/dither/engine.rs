use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::channel::{Channel, ChannelMap, InkSet};
use crate::matrix::{DitherMatrix, MatrixArena, MatrixCursor, MatrixId, ThresholdTable};
use crate::output::DitheredRow;

use super::error_rows::{apply_error, ErrorRows, ScanDirection, SpreadTables};
use super::options::{DerivedScalars, DitherOptions, Randomizers};
use super::print_color::{print_color, print_color_fast, ChannelDither, Dot, Mode};
use super::ranges::DitherColor;
use super::separation::{update_cmy, update_cmyk, Separation};
use super::{DitherAlgorithm, DitherError};

/// Above this density black ink does not reduce the color inks printed
/// on the same pixel.
const BLACK_REDUCTION_LIMIT: i32 = 45000;

const COLOR_CHANNELS: [Channel; 3] = [Channel::C, Channel::M, Channel::Y];

/// One scanline of ink amounts. `0` is no ink, `65535` full coverage.
#[derive(Debug, Clone, Copy)]
pub enum RowInput<'a> {
    /// Black only, for monochrome ink sets.
    Gray(&'a [u16]),
    /// Cyan, magenta and yellow; black is generated from them.
    Cmy {
        c: &'a [u16],
        m: &'a [u16],
        y: &'a [u16],
    },
}

/// Dither and pick matrix views of one channel.
#[derive(Debug, Clone)]
struct ChannelCursors {
    dither: MatrixCursor,
    pick: MatrixCursor,
}

/// Dither state of one print job.
///
/// Created once for a fixed output width and ink set; scanlines are fed
/// strictly in order through [`dither_row`](Self::dither_row). Setters may
/// be called between scanlines.
#[derive(Debug, Clone)]
pub struct DitherEngine {
    width: usize,
    ink_set: InkSet,
    algorithm: DitherAlgorithm,
    aspect: (u32, u32),
    options: DitherOptions,
    scalars: DerivedScalars,
    spread: SpreadTables,
    colors: ChannelMap<DitherColor>,
    arena: MatrixArena,
    base_matrix: MatrixId,
    pick_matrix: MatrixId,
    cursors: ChannelMap<ChannelCursors>,
    errors: ErrorRows,
    rng: StdRng,
    last_line_was_empty: u32,
}

fn derive_cursors(arena: &MatrixArena, base: MatrixId, pick: MatrixId) -> ChannelMap<ChannelCursors> {
    let matrix = arena.get(base);
    let x3 = matrix.width() / 3;
    let y3 = matrix.height() / 3;
    ChannelMap::from_fn(|channel| {
        let (dither_offset, pick_offset) = match channel {
            Channel::C | Channel::LightC => ((2 * x3, y3), (x3, 0)),
            Channel::M | Channel::LightM => ((x3, 2 * y3), (0, 2 * y3)),
            Channel::Y => ((0, y3), (2 * x3, 0)),
            Channel::K => ((0, 0), (x3, 2 * y3)),
        };
        ChannelCursors {
            dither: arena.clone_submatrix(base, dither_offset.0, dither_offset.1),
            pick: arena.clone_submatrix(pick, pick_offset.0, pick_offset.1),
        }
    })
}

fn channel_dither<'a>(
    channel: Channel,
    colors: &'a ChannelMap<DitherColor>,
    cursors: &'a mut ChannelMap<ChannelCursors>,
    arena: &'a MatrixArena,
) -> ChannelDither<'a> {
    let ChannelCursors { dither, pick } = &mut cursors[channel];
    ChannelDither {
        channel,
        color: &colors[channel],
        dither,
        pick,
        arena,
    }
}

impl DitherEngine {
    /// Create an engine with default tuning and square pixels.
    pub fn new(
        width: usize,
        ink_set: InkSet,
        algorithm: DitherAlgorithm,
        seed: u64,
    ) -> Result<Self, DitherError> {
        if width == 0 {
            return Err(DitherError::ZeroWidth);
        }
        let options = DitherOptions::default();
        let table = Self::table_for(algorithm, (1, 1));
        let base = table.build()?;
        let mut pick = base.clone();
        pick.exponential_rescale(options.transition);

        let mut arena = MatrixArena::new();
        let base_matrix = arena.insert(base);
        let pick_matrix = arena.insert(pick);
        let cursors = derive_cursors(&arena, base_matrix, pick_matrix);

        tracing::debug!(width, ?ink_set, %algorithm, ?table, "dither engine created");

        Ok(Self {
            width,
            ink_set,
            algorithm,
            aspect: (1, 1),
            scalars: DerivedScalars::new(&options),
            spread: SpreadTables::new(options.ink_spread),
            options,
            colors: ChannelMap::from_fn(|_| DitherColor::default()),
            arena,
            base_matrix,
            pick_matrix,
            cursors,
            errors: ErrorRows::new(width),
            rng: StdRng::seed_from_u64(seed),
            last_line_was_empty: 0,
        })
    }

    fn table_for(algorithm: DitherAlgorithm, aspect: (u32, u32)) -> ThresholdTable {
        if algorithm == DitherAlgorithm::VeryFast {
            ThresholdTable::Iterated64
        } else {
            ThresholdTable::for_aspect(aspect.0, aspect.1)
        }
    }

    fn install_base_matrix(&mut self, base: DitherMatrix) {
        let mut pick = base.clone();
        pick.exponential_rescale(self.options.transition);
        self.arena.replace(self.base_matrix, base);
        self.arena.replace(self.pick_matrix, pick);
        self.cursors = derive_cursors(&self.arena, self.base_matrix, self.pick_matrix);
    }

    fn rebuild_matrices(&mut self) -> Result<(), DitherError> {
        let table = Self::table_for(self.algorithm, self.aspect);
        tracing::debug!(?table, aspect = ?self.aspect, "selecting threshold table");
        let base = table.build()?;
        self.install_base_matrix(base);
        Ok(())
    }

    fn update_options(&mut self, options: DitherOptions) -> Result<(), DitherError> {
        options.validate()?;
        self.scalars = DerivedScalars::new(&options);
        if options.ink_spread != self.options.ink_spread {
            self.spread = SpreadTables::new(options.ink_spread);
        }
        self.options = options;
        Ok(())
    }

    /// Switch algorithm; re-derives the matrices from the resolution aspect.
    pub fn set_algorithm(&mut self, algorithm: DitherAlgorithm) -> Result<(), DitherError> {
        self.algorithm = algorithm;
        self.rebuild_matrices()
    }

    /// Resolution aspect (`x_dpi`, `y_dpi`) deciding the matrix shape.
    pub fn set_aspect(&mut self, x_aspect: u32, y_aspect: u32) -> Result<(), DitherError> {
        if x_aspect == 0 || y_aspect == 0 {
            return Err(DitherError::InvalidParameter {
                name: "aspect",
                value: 0.0,
            });
        }
        self.aspect = (x_aspect, y_aspect);
        self.rebuild_matrices()
    }

    /// Replace the base threshold matrix. Its pick matrix and all channel
    /// views are derived again.
    pub fn set_ordered_matrix(&mut self, matrix: DitherMatrix) {
        self.install_base_matrix(matrix);
    }

    pub fn set_options(&mut self, options: DitherOptions) -> Result<(), DitherError> {
        let transition_changed = options.transition != self.options.transition;
        self.update_options(options)?;
        if transition_changed {
            self.set_transition(self.options.transition)?;
        }
        Ok(())
    }

    pub fn set_density(&mut self, density: f64) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            density,
            ..self.options.clone()
        })
    }

    pub fn set_ink_spread(&mut self, spread: u32) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            ink_spread: spread,
            ..self.options.clone()
        })
    }

    pub fn set_black_lower(&mut self, lower: f64) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            black_lower: lower,
            ..self.options.clone()
        })
    }

    pub fn set_black_upper(&mut self, upper: f64) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            black_upper: upper,
            ..self.options.clone()
        })
    }

    pub fn set_randomizers(&mut self, randomizers: Randomizers) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            randomizers,
            ..self.options.clone()
        })
    }

    pub fn set_adaptive_divisor(&mut self, divisor: u32) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            adaptive_divisor: divisor,
            ..self.options.clone()
        })
    }

    /// Limit ink per pixel to `fraction * levels` dot-size units.
    pub fn set_max_ink(&mut self, max_ink: Option<(u32, f64)>) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            max_ink,
            ..self.options.clone()
        })
    }

    /// Rebuild the pick matrix with a new transition exponent.
    pub fn set_transition(&mut self, exponent: f64) -> Result<(), DitherError> {
        self.update_options(DitherOptions {
            transition: exponent,
            ..self.options.clone()
        })?;
        let base = self.arena.get(self.base_matrix).clone();
        self.install_base_matrix(base);
        Ok(())
    }

    /// Install the range table of a dark channel.
    ///
    /// Light channels take their ranges from their dark channel; a table
    /// using light ink needs the light channel in the ink set.
    pub fn set_ranges(&mut self, channel: Channel, color: DitherColor) -> Result<(), DitherError> {
        if !self.ink_set.has(channel) || matches!(channel, Channel::LightC | Channel::LightM) {
            return Err(DitherError::ChannelNotInInkSet(channel));
        }
        if color.uses_light_ink() {
            match channel.light() {
                Some(light) if self.ink_set.has(light) => {}
                Some(light) => return Err(DitherError::ChannelNotInInkSet(light)),
                None => return Err(DitherError::ChannelNotInInkSet(channel)),
            }
        }
        tracing::debug!(%channel, segments = color.segments().len(), planes = color.signif_bits(), "ranges set");
        self.colors[channel] = color;
        Ok(())
    }

    /// Light cyan / magenta below their dark inks. A value of `0` leaves
    /// the channel unchanged.
    pub fn set_light_inks(&mut self, c: f64, m: f64, density: f64) -> Result<(), DitherError> {
        if c > 0.0 {
            self.set_ranges(Channel::C, DitherColor::with_light_ink(c, density)?)?;
        }
        if m > 0.0 {
            self.set_ranges(Channel::M, DitherColor::with_light_ink(m, density)?)?;
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn ink_set(&self) -> InkSet {
        self.ink_set
    }

    #[inline]
    pub fn algorithm(&self) -> DitherAlgorithm {
        self.algorithm
    }

    #[inline]
    pub fn options(&self) -> &DitherOptions {
        &self.options
    }

    pub fn ranges(&self, channel: Channel) -> &DitherColor {
        &self.colors[channel]
    }

    /// Bit planes each channel's output carries.
    pub fn planes(&self) -> ChannelMap<u32> {
        ChannelMap::from_fn(|channel| match channel {
            Channel::LightC => self.colors[Channel::C].signif_bits(),
            Channel::LightM => self.colors[Channel::M].signif_bits(),
            dark => self.colors[dark].signif_bits(),
        })
    }

    /// Allocate an output row shaped for the current configuration.
    pub fn new_row(&self) -> DitheredRow {
        DitheredRow::new(self.width, self.ink_set, &self.planes())
    }

    /// Consecutive all-zero rows seen so far.
    #[inline]
    pub fn empty_run(&self) -> u32 {
        self.last_line_was_empty
    }

    fn check_len(&self, len: usize) -> Result<(), DitherError> {
        if len != self.width {
            return Err(DitherError::WidthMismatch {
                expected: self.width,
                actual: len,
            });
        }
        Ok(())
    }

    fn check_output(&self, out: &DitheredRow) -> Result<(), DitherError> {
        if !out.matches(self.width, self.ink_set, &self.planes()) {
            return Err(DitherError::WidthMismatch {
                expected: self.width,
                actual: out.width(),
            });
        }
        Ok(())
    }

    /// Dither scanline `row` into `out`.
    pub fn dither_row(
        &mut self,
        row: usize,
        input: RowInput<'_>,
        out: &mut DitheredRow,
    ) -> Result<(), DitherError> {
        self.check_output(out)?;
        match input {
            RowInput::Gray(k) => {
                if !self.ink_set.is_monochrome() {
                    return Err(DitherError::InputMismatch { expected: "cmy" });
                }
                self.check_len(k.len())?;
                self.dither_black(row, k, out);
            }
            RowInput::Cmy { c, m, y } => {
                if self.ink_set.is_monochrome() {
                    return Err(DitherError::InputMismatch { expected: "gray" });
                }
                self.check_len(c.len())?;
                self.check_len(m.len())?;
                self.check_len(y.len())?;
                self.dither_cmyk(row, c, m, y, out);
            }
        }
        Ok(())
    }

    /// Hard threshold for line art: a pixel gets every black plane when its
    /// ink amount is full and the density reaches the matrix value.
    pub fn dither_monochrome(
        &mut self,
        row: usize,
        k: &[u16],
        out: &mut DitheredRow,
    ) -> Result<(), DitherError> {
        self.check_output(out)?;
        if !self.ink_set.has_black() {
            return Err(DitherError::InputMismatch { expected: "cmy" });
        }
        self.check_len(k.len())?;
        out.clear();

        let density = self.scalars.density as u32;
        let cursor = &mut self.cursors[Channel::K].dither;
        cursor.set_row(row);
        let line = out.line_mut(Channel::K);
        for (x, &value) in k.iter().enumerate() {
            if value == u16::MAX && density >= cursor.value_at_fast(&self.arena, x) {
                line.set_all_planes(x);
            }
        }
        Ok(())
    }

    /// Update the empty-row counter and decide whether the row can be
    /// skipped. Clears error rows as a side effect for diffusion.
    fn skip_row(&mut self, row: usize, nonzero: bool) -> bool {
        if nonzero {
            self.last_line_was_empty = 0;
        } else {
            self.last_line_was_empty += 1;
        }
        let empty = self.last_line_was_empty;

        if self.algorithm.is_fast() {
            return empty > 0;
        }
        if (empty > 0 && self.algorithm.is_ordered()) || empty >= 5 {
            return true;
        }
        if self.algorithm.is_diffusion() {
            self.errors.clear_all_next(row);
            if empty >= 4 {
                if empty == 4 {
                    self.errors.clear_all_current(row);
                }
                return true;
            }
        }
        false
    }

    fn direction(&self, row: usize) -> ScanDirection {
        if self.algorithm.is_diffusion() {
            ScanDirection::for_row(row)
        } else {
            ScanDirection::LeftToRight
        }
    }

    fn set_rows(&mut self, row: usize) {
        for (_, cursors) in self.cursors.iter_mut() {
            cursors.dither.set_row(row);
            cursors.pick.set_row(row);
        }
    }

    fn dither_black(&mut self, row: usize, gray: &[u16], out: &mut DitheredRow) {
        out.clear();
        let nonzero = gray.iter().any(|&v| v != 0);
        if self.skip_row(row, nonzero) {
            return;
        }
        self.set_rows(row);
        if self.algorithm.is_fast() {
            self.dither_black_fast(gray, out);
            return;
        }

        let direction = self.direction(row);
        let mode = Mode::from(self.algorithm);
        let diffusion = self.algorithm.is_diffusion();
        let width = self.width;
        let Self {
            scalars,
            spread,
            colors,
            arena,
            cursors,
            errors,
            rng,
            ..
        } = self;

        let mut line = errors.line(Channel::K, row);
        let start = if direction == ScanDirection::LeftToRight { 0 } else { width - 1 };
        let mut carried = line.carried(start);

        for i in 0..width {
            let x = if direction == ScanDirection::LeftToRight { i } else { width - 1 - i };
            let mut budget = scalars.ink_limit;
            let k = gray[x] as i32;
            let mut ch = channel_dither(Channel::K, colors, cursors, arena);

            if !diffusion {
                let dot = Dot {
                    base: k,
                    density: k,
                    adjusted: k,
                    randomizer: scalars.k_randomizer,
                    dontprint: 0,
                };
                print_color(scalars, &mut ch, dot, x, mode, &mut budget, out, rng);
            } else {
                let dot = Dot {
                    base: k,
                    density: k,
                    adjusted: apply_error(k, carried),
                    randomizer: scalars.k_randomizer,
                    dontprint: 0,
                };
                let residual = print_color(scalars, &mut ch, dot, x, mode, &mut budget, out, rng);
                carried = line.diffuse(x, direction, residual, k, spread, rng);
            }
        }
    }

    fn dither_black_fast(&mut self, gray: &[u16], out: &mut DitheredRow) {
        let very_fast = self.colors[Channel::K].is_single_dark_bit();
        let mut ch = channel_dither(Channel::K, &self.colors, &mut self.cursors, &self.arena);
        for (x, &k) in gray.iter().enumerate() {
            let k = k as i32;
            print_color_fast(&mut ch, k, k, x, very_fast, out);
        }
    }

    fn dither_cmyk(&mut self, row: usize, c: &[u16], m: &[u16], y: &[u16], out: &mut DitheredRow) {
        out.clear();
        let nonzero = c.iter().chain(m).chain(y).any(|&v| v != 0);
        if self.skip_row(row, nonzero) {
            return;
        }
        self.set_rows(row);
        if self.algorithm.is_fast() {
            self.dither_cmyk_fast([c, m, y], out);
            return;
        }

        let direction = self.direction(row);
        let mode = Mode::from(self.algorithm);
        let diffusion = self.algorithm.is_diffusion();
        let has_black = self.ink_set.has_black();
        let width = self.width;
        let inputs = [c, m, y];
        let Self {
            scalars,
            spread,
            colors,
            arena,
            cursors,
            errors,
            rng,
            ..
        } = self;
        let randomizers = [scalars.c_randomizer, scalars.m_randomizer, scalars.y_randomizer];

        let mut lines = errors.color_lines(row);
        let start = if direction == ScanDirection::LeftToRight { 0 } else { width - 1 };
        let mut carried = [
            lines[0].carried(start),
            lines[1].carried(start),
            lines[2].carried(start),
        ];

        for i in 0..width {
            let x = if direction == ScanDirection::LeftToRight { i } else { width - 1 - i };
            let original = [inputs[0][x] as i32, inputs[1][x] as i32, inputs[2][x] as i32];
            let mut values = original;

            if original == [0, 0, 0] {
                if !diffusion {
                    continue;
                }
                for (v, e) in values.iter_mut().zip(carried) {
                    *v = apply_error(*v, e);
                }
            } else {
                let k = original[0].min(original[1]).min(original[2]);
                let sep = if k == 0 {
                    Separation {
                        c: original[0],
                        m: original[1],
                        y: original[2],
                        bk: 0,
                        k: 0,
                    }
                } else if has_black {
                    update_cmyk(scalars, original[0], original[1], original[2], k)
                } else {
                    update_cmy(original[0], original[1], original[2], k)
                };
                values = [sep.c, sep.m, sep.y];
                if diffusion {
                    for (v, e) in values.iter_mut().zip(carried) {
                        *v = apply_error(*v, e);
                    }
                }

                let mut budget = scalars.ink_limit;
                let mut printed_black = 0;
                if has_black {
                    let mut ch = channel_dither(Channel::K, colors, cursors, arena);
                    let dot = Dot {
                        base: sep.bk,
                        density: sep.bk,
                        adjusted: sep.k,
                        randomizer: 0,
                        dontprint: 0,
                    };
                    let residual = print_color(scalars, &mut ch, dot, x, Mode::ORDERED, &mut budget, out, rng);
                    printed_black = sep.k - residual;
                }
                if scalars.density > BLACK_REDUCTION_LIMIT {
                    printed_black = 0;
                }

                let first = (row + x) % 3;
                for step in 0..3 {
                    let idx = (first + step) % 3;
                    let mut ch = channel_dither(COLOR_CHANNELS[idx], colors, cursors, arena);
                    let dot = Dot {
                        base: original[idx],
                        density: original[idx],
                        adjusted: values[idx],
                        randomizer: randomizers[idx],
                        dontprint: printed_black,
                    };
                    values[idx] = print_color(scalars, &mut ch, dot, x, mode, &mut budget, out, rng);
                }
            }

            if diffusion {
                for idx in 0..3 {
                    carried[idx] = lines[idx].diffuse(x, direction, values[idx], original[idx], spread, rng);
                }
            }
        }
    }

    fn dither_cmyk_fast(&mut self, inputs: [&[u16]; 3], out: &mut DitheredRow) {
        let has_black = self.ink_set.has_black();
        let very_fast = ChannelMap::from_fn(|channel| self.colors[channel].is_single_dark_bit());
        let Self {
            colors,
            arena,
            cursors,
            width,
            ..
        } = self;

        for x in 0..*width {
            let original = [inputs[0][x] as i32, inputs[1][x] as i32, inputs[2][x] as i32];
            if original == [0, 0, 0] {
                continue;
            }
            let mut values = original;
            if has_black {
                let min = original[0].min(original[1]).min(original[2]);
                let k = if min < 32768 { 0 } else { 65535 - (65535 - min) * 2 };
                for v in &mut values {
                    *v -= k;
                }
                let mut ch = channel_dither(Channel::K, colors, cursors, arena);
                print_color_fast(&mut ch, k, k, x, very_fast[Channel::K], out);
            }
            for (idx, channel) in COLOR_CHANNELS.into_iter().enumerate() {
                let mut ch = channel_dither(channel, colors, cursors, arena);
                print_color_fast(&mut ch, original[idx], values[idx], x, very_fast[channel], out);
            }
        }
    }
}
