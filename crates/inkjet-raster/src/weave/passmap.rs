//! Page-edge pass remapping.
//!
//! Raw passes near the top of the page start above the first printed row,
//! so some of their nozzles would print nothing. [`PassMap`] moves every
//! such pass down to its first real row and every pass overhanging the
//! bottom of the page back up, then renumbers passes so that emitted
//! numbers follow physical start rows.

use super::geometry::WeaveGeometry;
use super::WeaveError;

/// Rows of the page that receive ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first_row: usize,
    pub last_row: usize,
    pub page_length: usize,
}

impl PageRange {
    pub fn new(first_row: usize, last_row: usize, page_length: usize) -> Result<Self, WeaveError> {
        if first_row > last_row || last_row >= page_length {
            return Err(WeaveError::InvalidPage {
                first_row,
                last_row,
                page_length,
            });
        }
        Ok(Self {
            first_row,
            last_row,
            page_length,
        })
    }

    /// Print `rows` rows from the top of a page of the same length.
    pub fn rows(rows: usize) -> Result<Self, WeaveError> {
        Self::new(0, rows.saturating_sub(1), rows)
    }

    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }
}

/// One emitted pass after remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassRecord {
    /// Emitted pass number.
    pub pass: i64,
    pub raw_pass: i64,
    pub subpass: usize,
    /// Where the geometry alone would start the pass.
    pub logical_start_row: i64,
    pub physical_start_row: i64,
    pub physical_end_row: i64,
    /// First nozzle printing a real row.
    pub first_jet: usize,
    pub nozzles_used: usize,
    pub phantom_rows: usize,
}

impl PassRecord {
    /// Row of the first nozzle that prints, if any does.
    pub fn first_real_row(&self, separation: usize) -> Option<i64> {
        (self.nozzles_used > 0)
            .then(|| self.physical_start_row + (self.first_jet * separation) as i64)
    }

    /// Row of the last nozzle that prints, if any does.
    pub fn last_real_row(&self, separation: usize) -> Option<i64> {
        (self.nozzles_used > 0).then(|| {
            self.physical_start_row + ((self.first_jet + self.nozzles_used - 1) * separation) as i64
        })
    }
}

/// Where one row of one subpass is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPlacement {
    pub pass: i64,
    pub jet: usize,
    pub pass_start_row: i64,
    pub phantom_rows: usize,
    pub nozzles_used: usize,
}

/// Emitted pass layout of one page.
#[derive(Debug, Clone)]
pub struct PassMap {
    geometry: WeaveGeometry,
    page: PageRange,
    first_premapped_pass: i64,
    first_unused_pass: i64,
    /// Records in emitted order.
    records: Vec<PassRecord>,
    /// Index into `records` for every raw pass, offset by `first_premapped_pass`.
    emitted_of_raw: Vec<usize>,
    /// Row after which each emitted pass may flush.
    ready_rows: Vec<i64>,
    window: usize,
}

/// Smallest pass in `lo..hi` satisfying a monotone predicate, `hi` if none.
fn first_pass_where(mut lo: i64, mut hi: i64, pred: impl Fn(i64) -> bool) -> i64 {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

impl PassMap {
    /// Lay out every pass that prints a row of `page`.
    ///
    /// A pass whose nozzles would start above `first_row` is moved down
    /// until its first nozzle sits on its first real row, leaving the
    /// phantom nozzles at the bottom of the head. Each top partial pass
    /// therefore keeps all its real rows, instead of partial passes being
    /// redistributed evenly across the separation rows. A pass running past
    /// the page bottom is lifted back by whole nozzle pitches. Passes are
    /// then numbered in order of physical start row.
    pub fn new(geometry: WeaveGeometry, page: PageRange) -> Result<Self, WeaveError> {
        let page = PageRange::new(page.first_row, page.last_row, page.page_length)?;
        let s = geometry.separation() as i64;
        let jets = geometry.jets();
        let span = geometry.head_span();
        let first_row = page.first_row as i64;
        let last_row = page.last_row as i64;
        let bottom = page.page_length as i64 - 1;
        let start = |p: i64| geometry.raw_pass_parameters(p).start_row;

        // Raw starts strictly increase, so both bounds are binary searches
        // inside a bracket widened band by band.
        let step = geometry.band_passes();
        let mut lo = -step;
        while start(lo) + span >= first_row {
            lo -= step;
        }
        let mut hi = step;
        while start(hi) <= last_row {
            hi += step;
        }
        let first_premapped_pass = first_pass_where(lo, hi, |p| start(p) + span >= first_row);
        let first_unused_pass = first_pass_where(first_premapped_pass, hi, |p| start(p) > last_row);

        let mut records: Vec<PassRecord> = (first_premapped_pass..first_unused_pass)
            .map(|raw_pass| {
                let raw = geometry.raw_pass_parameters(raw_pass);
                let logical = raw.start_row;
                let skipped = if logical < first_row {
                    (first_row - logical + s - 1) / s
                } else {
                    0
                };
                let last_jet = ((last_row - logical).div_euclid(s)).min(jets as i64 - 1);
                let nozzles_used = (last_jet - skipped + 1).max(0) as usize;

                let mut physical = logical + skipped * s;
                let mut first_jet = 0;
                let overrun = physical + span - bottom;
                if overrun > 0 {
                    let lift = ((overrun + s - 1) / s).min((physical - first_row).div_euclid(s)).max(0);
                    physical -= lift * s;
                    first_jet = lift as usize;
                }

                PassRecord {
                    pass: raw_pass,
                    raw_pass,
                    subpass: raw.subpass,
                    logical_start_row: logical,
                    physical_start_row: physical,
                    physical_end_row: physical + span,
                    first_jet,
                    nozzles_used,
                    phantom_rows: jets - nozzles_used,
                }
            })
            .collect();

        records.sort_by_key(|r| (r.physical_start_row, r.raw_pass));
        let mut emitted_of_raw = vec![0; records.len()];
        for (i, record) in records.iter_mut().enumerate() {
            record.pass = first_premapped_pass + i as i64;
            emitted_of_raw[(record.raw_pass - first_premapped_pass) as usize] = i;
        }

        let ready_rows: Vec<i64> = records
            .iter()
            .map(|r| r.last_real_row(geometry.separation()).unwrap_or(first_row))
            .collect();
        let window = Self::required_window(&records, &ready_rows, geometry.separation());
        let base = geometry.band_passes() as usize * 2;

        tracing::debug!(
            first_premapped_pass,
            first_unused_pass,
            first_row,
            last_row,
            window,
            "pass map"
        );

        Ok(Self {
            geometry,
            page,
            first_premapped_pass,
            first_unused_pass,
            records,
            emitted_of_raw,
            ready_rows,
            window: window.max(base),
        })
    }

    /// Most passes open at once when rows arrive in order and every pass
    /// flushes as soon as it and all earlier passes are ready.
    fn required_window(records: &[PassRecord], ready_rows: &[i64], separation: usize) -> usize {
        let mut flush_rows = Vec::with_capacity(ready_rows.len());
        let mut latest = i64::MIN;
        for &row in ready_rows {
            latest = latest.max(row);
            flush_rows.push(latest);
        }

        records
            .iter()
            .enumerate()
            .filter_map(|(n, r)| r.first_real_row(separation).map(|open| (n, open)))
            .map(|(n, open)| {
                // Passes flushing at or after the opening row are still buffered.
                let oldest_open = flush_rows.partition_point(|&f| f < open);
                n + 1 - oldest_open.min(n)
            })
            .max()
            .unwrap_or(1)
    }

    #[inline]
    pub fn geometry(&self) -> &WeaveGeometry {
        &self.geometry
    }

    #[inline]
    pub fn page(&self) -> PageRange {
        self.page
    }

    #[inline]
    pub fn first_premapped_pass(&self) -> i64 {
        self.first_premapped_pass
    }

    #[inline]
    pub fn first_unused_pass(&self) -> i64 {
        self.first_unused_pass
    }

    /// Number of emitted passes.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in emitted order.
    pub fn records(&self) -> &[PassRecord] {
        &self.records
    }

    /// Record of emitted pass `pass`.
    pub fn record(&self, pass: i64) -> Option<&PassRecord> {
        let index = usize::try_from(pass - self.first_premapped_pass).ok()?;
        self.records.get(index)
    }

    /// Last page row that has to arrive before `pass` holds all its rows.
    pub fn ready_row(&self, pass: i64) -> Option<i64> {
        let index = usize::try_from(pass - self.first_premapped_pass).ok()?;
        self.ready_rows.get(index).copied()
    }

    /// Ring size the accumulator needs: `2 * S * H`, widened when the
    /// page-edge remapping keeps more passes open than that.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn row_parameters(&self, row: usize, subpass: usize) -> Result<RowPlacement, WeaveError> {
        let (record, jet) = self.locate(row, subpass)?;
        Ok(RowPlacement {
            pass: record.pass,
            jet,
            pass_start_row: record.physical_start_row,
            phantom_rows: record.phantom_rows,
            nozzles_used: record.nozzles_used,
        })
    }

    /// The pass record and nozzle printing `row` in `subpass`.
    pub(crate) fn locate(&self, row: usize, subpass: usize) -> Result<(&PassRecord, usize), WeaveError> {
        if !self.page.contains(row) {
            return Err(WeaveError::RowOutsidePage {
                row,
                first_row: self.page.first_row,
                last_row: self.page.last_row,
            });
        }
        let raw = self
            .geometry
            .raw_row_parameters(row as i64, subpass % self.geometry.oversample());
        let index = self.emitted_of_raw[(raw.pass - self.first_premapped_pass) as usize];
        let record = &self.records[index];
        let jet = (row as i64 - record.physical_start_row) / self.geometry.separation() as i64;
        Ok((record, jet as usize))
    }
}
