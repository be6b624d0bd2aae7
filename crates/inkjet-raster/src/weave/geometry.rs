//! Raw softweave geometry.
//!
//! A head with `J` nozzles spaced `S` rows apart prints every `S`-th row
//! in one pass. Interleaving `S` passes fills the gaps; oversampling `H`
//! prints each row `H` times, each time a different column phase. Passes
//! are grouped into bands of `S * H` passes that advance the paper by
//! `S * J` rows.
//!
//! Inside a band the head advances by `A = J / H` rows per pass. When
//! `gcd(S, A) = B > 1` the plain advance would revisit the same row
//! residues, so the passes are split into `B` sub-blocks, each shifted by
//! a small row offset chosen by a [`WeaveStrategy`].

use std::fmt;
use std::str::FromStr;

use super::WeaveError;

/// Order in which sub-blocks take their row offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeaveStrategy {
    /// 0, 2, 4, .. then back down the odd offsets.
    #[default]
    ZigZag,
    Ascending,
    Descending,
    /// Even offsets then odd offsets.
    AscendingTwoX,
    /// Offsets in steps of three.
    AscendingThreeX,
    /// Low half and high half interleaved.
    StaggeredZigZag,
}

impl WeaveStrategy {
    pub const ALL: [WeaveStrategy; 6] = [
        WeaveStrategy::ZigZag,
        WeaveStrategy::Ascending,
        WeaveStrategy::Descending,
        WeaveStrategy::AscendingTwoX,
        WeaveStrategy::AscendingThreeX,
        WeaveStrategy::StaggeredZigZag,
    ];

    /// Numeric id, `1..=6`.
    pub const fn id(self) -> u32 {
        match self {
            WeaveStrategy::ZigZag => 1,
            WeaveStrategy::Ascending => 2,
            WeaveStrategy::Descending => 3,
            WeaveStrategy::AscendingTwoX => 4,
            WeaveStrategy::AscendingThreeX => 5,
            WeaveStrategy::StaggeredZigZag => 6,
        }
    }

    pub fn from_id(id: u32) -> Result<Self, WeaveError> {
        WeaveStrategy::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or(WeaveError::UnknownStrategy(id))
    }

    pub const fn name(self) -> &'static str {
        match self {
            WeaveStrategy::ZigZag => "zigzag",
            WeaveStrategy::Ascending => "ascending",
            WeaveStrategy::Descending => "descending",
            WeaveStrategy::AscendingTwoX => "ascending-2x",
            WeaveStrategy::AscendingThreeX => "ascending-3x",
            WeaveStrategy::StaggeredZigZag => "staggered-zigzag",
        }
    }

    /// Row offset of every sub-block, a permutation of `0..sub_blocks`.
    pub fn offsets(self, sub_blocks: usize) -> Vec<usize> {
        let b = sub_blocks;
        match self {
            WeaveStrategy::ZigZag => (0..b)
                .map(|i| if 2 * i < b { 2 * i } else { 2 * (b - i) - 1 })
                .collect(),
            WeaveStrategy::Ascending => (0..b).collect(),
            WeaveStrategy::Descending => (0..b).rev().collect(),
            WeaveStrategy::AscendingTwoX => (0..b).step_by(2).chain((1..b).step_by(2)).collect(),
            WeaveStrategy::AscendingThreeX => {
                let mut offsets: Vec<usize> = (0..b).collect();
                offsets.sort_by_key(|&o| (o % 3, o / 3));
                offsets
            }
            WeaveStrategy::StaggeredZigZag => {
                let half = b.div_ceil(2);
                (0..b)
                    .map(|i| if i % 2 == 0 { i / 2 } else { half + i / 2 })
                    .collect()
            }
        }
    }
}

impl fmt::Display for WeaveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeaveStrategy {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(id) = wanted.parse::<u32>() {
            return WeaveStrategy::from_id(id);
        }
        WeaveStrategy::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| WeaveError::UnknownStrategyName(s.to_string()))
    }
}

/// Start of one raw pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPass {
    pub pass: i64,
    pub start_row: i64,
    pub subpass: usize,
}

/// Raw (pass, nozzle) printing a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRow {
    pub pass: i64,
    pub jet: usize,
    pub start_row: i64,
}

/// Head geometry and the derived raw pass layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveGeometry {
    separation: usize,
    jets: usize,
    oversample: usize,
    strategy: WeaveStrategy,
    advance_basis: usize,
    sub_blocks: usize,
    passes_per_sub_block: usize,
    offsets: Vec<usize>,
    inverse: Vec<usize>,
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl WeaveGeometry {
    pub fn new(
        separation: usize,
        jets: usize,
        oversample: usize,
        strategy: WeaveStrategy,
    ) -> Result<Self, WeaveError> {
        if separation == 0 {
            return Err(WeaveError::ZeroSeparation);
        }
        if jets == 0 {
            return Err(WeaveError::ZeroJets);
        }
        if oversample == 0 {
            return Err(WeaveError::ZeroOversample);
        }
        if oversample > jets {
            return Err(WeaveError::OversampleExceedsJets { oversample, jets });
        }

        let advance_basis = jets / oversample;
        let sub_blocks = gcd(separation, advance_basis);
        let passes_per_sub_block = separation / sub_blocks;
        let offsets = strategy.offsets(sub_blocks);
        let mut inverse = vec![0; sub_blocks];
        for (block, &offset) in offsets.iter().enumerate() {
            inverse[offset] = block;
        }

        tracing::debug!(
            separation,
            jets,
            oversample,
            %strategy,
            advance_basis,
            sub_blocks,
            "weave geometry"
        );

        Ok(Self {
            separation,
            jets,
            oversample,
            strategy,
            advance_basis,
            sub_blocks,
            passes_per_sub_block,
            offsets,
            inverse,
        })
    }

    /// One nozzle, no interleaving: every row is its own pass.
    pub fn single_row() -> Self {
        Self {
            separation: 1,
            jets: 1,
            oversample: 1,
            strategy: WeaveStrategy::ZigZag,
            advance_basis: 1,
            sub_blocks: 1,
            passes_per_sub_block: 1,
            offsets: vec![0],
            inverse: vec![0],
        }
    }

    #[inline]
    pub fn separation(&self) -> usize {
        self.separation
    }

    #[inline]
    pub fn jets(&self) -> usize {
        self.jets
    }

    #[inline]
    pub fn oversample(&self) -> usize {
        self.oversample
    }

    #[inline]
    pub fn strategy(&self) -> WeaveStrategy {
        self.strategy
    }

    #[inline]
    pub fn advance_basis(&self) -> usize {
        self.advance_basis
    }

    #[inline]
    pub fn sub_blocks(&self) -> usize {
        self.sub_blocks
    }

    #[inline]
    pub fn passes_per_sub_block(&self) -> usize {
        self.passes_per_sub_block
    }

    /// Passes per band.
    #[inline]
    pub fn band_passes(&self) -> i64 {
        (self.separation * self.oversample) as i64
    }

    /// Rows per band.
    #[inline]
    pub fn band_rows(&self) -> i64 {
        (self.separation * self.jets) as i64
    }

    /// Rows from a pass's first to its last nozzle.
    #[inline]
    pub fn head_span(&self) -> i64 {
        ((self.jets - 1) * self.separation) as i64
    }

    pub fn raw_pass_parameters(&self, pass: i64) -> RawPass {
        let s = self.separation as i64;
        let band = pass.div_euclid(self.band_passes());
        let pass_in_band = pass.rem_euclid(self.band_passes());
        let block = ((pass_in_band % s) / self.passes_per_sub_block as i64) as usize;
        let start_row =
            band * self.band_rows() + self.advance_basis as i64 * pass_in_band + self.offsets[block] as i64;
        RawPass {
            pass,
            start_row,
            subpass: (pass_in_band / s) as usize,
        }
    }

    /// The raw pass and nozzle printing `row` in `subpass`.
    pub fn raw_row_parameters(&self, row: i64, subpass: usize) -> RawRow {
        let s = self.separation as i64;
        let a = self.advance_basis as i64;
        let offset = row.rem_euclid(self.sub_blocks as i64);
        let block = self.inverse[offset as usize] as i64;

        let residue = (row - offset).rem_euclid(s);
        let t = (0..self.passes_per_sub_block as i64)
            .find(|t| (a * t).rem_euclid(s) == residue)
            .unwrap_or(0);
        let q = block * self.passes_per_sub_block as i64 + t;

        let pass_in_band = subpass as i64 * s + q;
        let base = a * pass_in_band + offset;
        let band = (row - base).div_euclid(self.band_rows());
        let start_row = band * self.band_rows() + base;
        RawRow {
            pass: band * self.band_passes() + pass_in_band,
            jet: ((row - start_row) / s) as usize,
            start_row,
        }
    }
}
