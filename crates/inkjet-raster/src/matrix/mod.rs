//! Ordered-dither threshold matrices.
//!
//! A [`DitherMatrix`] is an immutable tile of thresholds in `0..65536`.
//! Matrices live in a [`MatrixArena`]; every consumer reads them through a
//! [`MatrixCursor`], a lightweight view holding its own tile offset and an
//! incremental position so that scanning a row costs O(1) per pixel.
//!
//! Several cursors may view the same matrix at different offsets. This is
//! how each ink channel gets a spatially decorrelated pattern without
//! duplicating the table.
//!
//! # Example
//!
//! ```
//! use inkjet_raster::matrix::{DitherMatrix, MatrixArena};
//!
//! let mut arena = MatrixArena::new();
//! let id = arena.insert(DitherMatrix::iterated(2, 2, &[0, 2, 3, 1]).unwrap());
//!
//! let mut cursor = arena.clone_submatrix(id, 1, 0);
//! cursor.set_row(0);
//! let first = cursor.value_at(&arena, 0);
//! assert!(first < 65536);
//! ```

mod tables;

pub use tables::{ThresholdTable, FAST_STEPS, SQ2};

use crate::dither::DitherError;

/// A rectangular tile of ordered-dither thresholds, scaled into `0..65536`.
#[derive(Debug, Clone, PartialEq)]
pub struct DitherMatrix {
    base: usize,
    exponent: u32,
    width: usize,
    height: usize,
    values: Vec<u32>,
}

impl DitherMatrix {
    /// Build a self-similar matrix of width `size^exponent` from a
    /// `size` x `size` seed.
    ///
    /// Each cell sums the seed value at every positional scale, the
    /// coarsest scale contributing the least significant digit:
    ///
    /// ```text
    /// point(x, y) = sum_i seed[ya_i + xa_i*size] * (size*size)^(exponent-1-i)
    /// xa_i = (x / size^i) % size,  ya_i = (y / size^i) % size
    /// ```
    pub fn iterated(size: usize, exponent: u32, seed: &[u32]) -> Result<Self, DitherError> {
        if size == 0 || exponent == 0 {
            return Err(DitherError::DegenerateMatrix);
        }
        if seed.len() != size * size {
            return Err(DitherError::MatrixSize {
                width: size,
                height: size,
                len: seed.len(),
            });
        }
        let width = size
            .checked_pow(exponent)
            .ok_or(DitherError::DegenerateMatrix)?;
        let total = (width * width) as u64;

        let mut values = vec![0u32; width * width];
        for y in 0..width {
            for x in 0..width {
                let point = ordered_point(x, y, exponent, size, seed);
                values[x + y * width] = (point * 65536 / total) as u32;
            }
        }

        Ok(Self {
            base: size,
            exponent,
            width,
            height: width,
            values,
        })
    }

    /// Copy a precomputed rank table into matrix storage.
    ///
    /// `table` holds `width * height` ranks. Without `transpose` the cell
    /// `(x, y)` reads `table[x + y * width]`; with it, `table[y + x * height]`
    /// (the table was laid out for the swapped aspect ratio). Every rank is
    /// scaled by `65536 / (width * height)`.
    pub fn from_table(
        width: usize,
        height: usize,
        table: &[u32],
        transpose: bool,
    ) -> Result<Self, DitherError> {
        if width == 0 || height == 0 {
            return Err(DitherError::DegenerateMatrix);
        }
        if table.len() != width * height {
            return Err(DitherError::MatrixSize {
                width,
                height,
                len: table.len(),
            });
        }
        let total = (width * height) as u64;

        let mut values = vec![0u32; width * height];
        for y in 0..height {
            for x in 0..width {
                let rank = if transpose {
                    table[y + x * height]
                } else {
                    table[x + y * width]
                };
                values[x + y * width] = (rank as u64 * 65536 / total) as u32;
            }
        }

        Ok(Self {
            base: width,
            exponent: 1,
            width,
            height,
            values,
        })
    }

    /// Rescale every threshold to `65535 * (v / 65535)^exponent`.
    ///
    /// Exponents below 1 push thresholds up, which biases the pick between
    /// two dot sizes towards the larger one.
    pub fn exponential_rescale(&mut self, exponent: f64) {
        for v in &mut self.values {
            let normalized = *v as f64 / 65535.0;
            *v = (65535.0 * normalized.powf(exponent)) as u32;
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Seed size for iterated matrices, width for table matrices.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Threshold at tile coordinates.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.values[(x % self.width) + (y % self.height) * self.width]
    }

    #[inline]
    pub fn values(&self) -> &[u32] {
        &self.values
    }
}

fn ordered_point(x: usize, y: usize, steps: u32, size: usize, seed: &[u32]) -> u64 {
    let mut point = 0u64;
    let mut divisor = 1usize;
    for i in 0..steps {
        let xa = (x / divisor) % size;
        let ya = (y / divisor) % size;
        let scale = ((size * size) as u64).pow(steps - 1 - i);
        point += seed[ya + xa * size] as u64 * scale;
        divisor *= size;
    }
    point
}

/// Handle to a matrix owned by a [`MatrixArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixId(usize);

/// Owner of all threshold storage for one dither job.
#[derive(Debug, Default, Clone)]
pub struct MatrixArena {
    matrices: Vec<DitherMatrix>,
}

impl MatrixArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, matrix: DitherMatrix) -> MatrixId {
        self.matrices.push(matrix);
        MatrixId(self.matrices.len() - 1)
    }

    /// Swap the storage behind `id`. Cursors previously cloned from `id`
    /// are stale afterwards and must be cloned again.
    pub fn replace(&mut self, id: MatrixId, matrix: DitherMatrix) {
        self.matrices[id.0] = matrix;
    }

    #[inline]
    pub fn get(&self, id: MatrixId) -> &DitherMatrix {
        &self.matrices[id.0]
    }

    /// Create a view of matrix `id` shifted by a fixed tile offset.
    pub fn clone_submatrix(&self, id: MatrixId, x_offset: usize, y_offset: usize) -> MatrixCursor {
        let matrix = self.get(id);
        let x_size = matrix.width;
        let y_size = matrix.height;
        let fast_mask = (matrix.exponent > 1 && x_size.is_power_of_two()).then(|| x_size - 1);
        let last_x_mod = x_offset % x_size;
        let last_y_mod = x_size * (y_offset % y_size);
        MatrixCursor {
            id,
            x_size,
            y_size,
            x_offset,
            y_offset,
            fast_mask,
            last_x: 0,
            last_x_mod,
            last_y_mod,
            index: last_x_mod + last_y_mod,
        }
    }
}

/// Incremental reader over one matrix at a fixed tile offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCursor {
    id: MatrixId,
    x_size: usize,
    y_size: usize,
    x_offset: usize,
    y_offset: usize,
    fast_mask: Option<usize>,
    last_x: usize,
    last_x_mod: usize,
    last_y_mod: usize,
    index: usize,
}

impl MatrixCursor {
    /// Select the matrix row used for output row `y`.
    #[inline]
    pub fn set_row(&mut self, y: usize) {
        self.last_y_mod = self.x_size * ((y + self.y_offset) % self.y_size);
        self.index = self.last_x_mod + self.last_y_mod;
    }

    /// Threshold for column `x` of the current row.
    ///
    /// Stepping `x` by one in either direction (or repeating it) only
    /// adjusts the cached index; any other jump recomputes the modulus.
    #[inline]
    pub fn value_at(&mut self, arena: &MatrixArena, x: usize) -> u32 {
        debug_assert_eq!(arena.get(self.id).width, self.x_size, "stale matrix cursor");

        if x == self.last_x + 1 {
            self.last_x = x;
            self.last_x_mod += 1;
            self.index += 1;
            if self.last_x_mod >= self.x_size {
                self.last_x_mod -= self.x_size;
                self.index -= self.x_size;
            }
        } else if x + 1 == self.last_x {
            self.last_x = x;
            if self.last_x_mod == 0 {
                self.last_x_mod = self.x_size - 1;
                self.index += self.x_size - 1;
            } else {
                self.last_x_mod -= 1;
                self.index -= 1;
            }
        } else if x != self.last_x {
            self.last_x = x;
            self.last_x_mod = (x + self.x_offset) % self.x_size;
            self.index = self.last_x_mod + self.last_y_mod;
        }
        arena.get(self.id).values[self.index]
    }

    /// Threshold lookup for the fast dither paths.
    ///
    /// Power-of-two iterated matrices are indexed with a mask and no cursor
    /// bookkeeping; everything else falls back to [`value_at`](Self::value_at).
    #[inline]
    pub fn value_at_fast(&mut self, arena: &MatrixArena, x: usize) -> u32 {
        match self.fast_mask {
            Some(mask) => arena.get(self.id).values[self.last_y_mod + ((x + self.x_offset) & mask)],
            None => self.value_at(arena, x),
        }
    }

    #[inline]
    pub fn id(&self) -> MatrixId {
        self.id
    }

    #[inline]
    pub fn offset(&self) -> (usize, usize) {
        (self.x_offset, self.y_offset)
    }
}
