use super::accumulator::{PassAccumulator, PassEmitter};
use super::geometry::WeaveGeometry;
use super::passmap::{PageRange, PassMap};
use super::WeaveError;
use crate::channel::{ChannelMap, InkSet};
use crate::output::{DitheredRow, PackedLine};

/// Streams dithered rows into passes.
///
/// Rows arrive in strictly increasing order; every pass is flushed to the
/// emitter as soon as it and all passes before it hold their last row.
#[derive(Debug, Clone)]
pub struct Softweave {
    map: PassMap,
    accumulator: PassAccumulator,
    width: usize,
    ink_set: InkSet,
    planes: ChannelMap<u32>,
    phase_width: usize,
    last_row: Option<usize>,
    rows_written: usize,
}

/// Pixels `x = phase (mod oversample)` of `line`, packed side by side.
fn column_phase(line: &PackedLine, phase: usize, oversample: usize, phase_width: usize) -> PackedLine {
    let mut out = PackedLine::new(phase_width, line.planes());
    for (i, x) in (phase..line.width()).step_by(oversample).enumerate() {
        let bits = line.pixel(x);
        if bits != 0 {
            out.set_bits(i, bits);
        }
    }
    out
}

impl Softweave {
    pub fn new(
        geometry: WeaveGeometry,
        page: PageRange,
        width: usize,
        ink_set: InkSet,
        planes: &ChannelMap<u32>,
    ) -> Result<Self, WeaveError> {
        let map = PassMap::new(geometry, page)?;
        let phase_width = width.div_ceil(map.geometry().oversample());
        let layout = ink_set.channels().iter().map(|&c| (c, planes[c])).collect();
        let accumulator = PassAccumulator::new(&map, layout, phase_width.div_ceil(8));
        tracing::debug!(
            width,
            phase_width,
            passes = map.len(),
            window = accumulator.window(),
            "softweave ready"
        );
        Ok(Self {
            map,
            accumulator,
            width,
            ink_set,
            planes: ChannelMap::from_fn(|c| planes[c]),
            phase_width,
            last_row: None,
            rows_written: 0,
        })
    }

    /// Every row as its own one-nozzle pass.
    pub fn unwoven(
        page: PageRange,
        width: usize,
        ink_set: InkSet,
        planes: &ChannelMap<u32>,
    ) -> Result<Self, WeaveError> {
        Self::new(WeaveGeometry::single_row(), page, width, ink_set, planes)
    }

    #[inline]
    pub fn pass_map(&self) -> &PassMap {
        &self.map
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of one column phase.
    #[inline]
    pub fn phase_width(&self) -> usize {
        self.phase_width
    }

    #[inline]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    #[inline]
    pub fn open_passes(&self) -> usize {
        self.accumulator.open_passes()
    }

    /// Whether `row` may be written next: on the page and past the last
    /// row written.
    pub fn check_row(&self, row: usize) -> Result<(), WeaveError> {
        let page = self.map.page();
        if !page.contains(row) {
            return Err(WeaveError::RowOutsidePage {
                row,
                first_row: page.first_row,
                last_row: page.last_row,
            });
        }
        match self.last_row {
            Some(previous) if row <= previous => Err(WeaveError::RowOutOfOrder { row, previous }),
            _ => Ok(()),
        }
    }

    /// Place page row `row` into its passes and flush what became ready.
    pub fn write_row<E: PassEmitter + ?Sized>(
        &mut self,
        row: usize,
        dithered: &DitheredRow,
        emitter: &mut E,
    ) -> Result<(), WeaveError> {
        if dithered.width() != self.width {
            return Err(WeaveError::WidthMismatch {
                expected: self.width,
                actual: dithered.width(),
            });
        }
        if !dithered.matches(self.width, self.ink_set, &self.planes) {
            return Err(WeaveError::RowLayoutMismatch);
        }
        self.check_row(row)?;

        // Skipped rows stay blank, so passes ending on them are complete.
        self.accumulator
            .flush_ready(&self.map, row as i64 - 1, emitter)?;

        let oversample = self.map.geometry().oversample();
        for subpass in 0..oversample {
            let (record, jet) = self.map.locate(row, subpass)?;
            for (channel, line) in dithered.lines() {
                if oversample == 1 {
                    self.accumulator.add_row(record, jet, channel, line)?;
                } else {
                    let phase = column_phase(line, subpass, oversample, self.phase_width);
                    self.accumulator.add_row(record, jet, channel, &phase)?;
                }
            }
        }

        self.last_row = Some(row);
        self.rows_written += 1;
        self.accumulator.flush_ready(&self.map, row as i64, emitter)?;
        Ok(())
    }

    /// Flush every pass still pending; returns how many were flushed.
    pub fn finish<E: PassEmitter + ?Sized>(&mut self, emitter: &mut E) -> Result<usize, WeaveError> {
        let flushed = self.accumulator.finish(&self.map, emitter)?;
        tracing::debug!(rows = self.rows_written, flushed, "softweave finished");
        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::weave::{FlushedPass, WeaveStrategy};

    fn planes() -> ChannelMap<u32> {
        ChannelMap::from_fn(|_| 1)
    }

    fn black_row(width: usize, pattern: impl Fn(usize) -> bool) -> DitheredRow {
        let mut row = DitheredRow::new(width, InkSet::Monochrome, &planes());
        for x in (0..width).filter(|&x| pattern(x)) {
            row.line_mut(Channel::K).set_bits(x, 1);
        }
        row
    }

    #[test]
    fn test_unwoven_emits_one_pass_per_row() {
        let page = PageRange::rows(3).unwrap();
        let mut weave = Softweave::unwoven(page, 8, InkSet::Monochrome, &planes()).unwrap();
        let mut out: Vec<FlushedPass> = Vec::new();
        for row in 0..3 {
            weave.write_row(row, &black_row(8, |x| x == row), &mut out).unwrap();
            assert_eq!(out.len(), row + 1, "row {row} flushes immediately");
        }
        assert_eq!(weave.finish(&mut out).unwrap(), 0);
        let rows: Vec<Vec<u8>> = out
            .iter()
            .map(|p| p.plane_rows(Channel::K, 0).unwrap().remove(0))
            .collect();
        assert_eq!(rows, vec![vec![0x80], vec![0x40], vec![0x20]]);
        assert!(out.iter().all(|p| p.advance == if p.pass == 0 { 0 } else { 1 }));
    }

    #[test]
    fn test_rows_must_increase() {
        let page = PageRange::rows(10).unwrap();
        let mut weave = Softweave::unwoven(page, 8, InkSet::Monochrome, &planes()).unwrap();
        let mut out: Vec<FlushedPass> = Vec::new();
        weave.write_row(4, &black_row(8, |_| true), &mut out).unwrap();
        assert!(matches!(
            weave.write_row(4, &black_row(8, |_| true), &mut out),
            Err(WeaveError::RowOutOfOrder { row: 4, previous: 4 })
        ));
        assert!(matches!(
            weave.write_row(10, &black_row(8, |_| true), &mut out),
            Err(WeaveError::RowOutsidePage { row: 10, .. })
        ));
    }

    #[test]
    fn test_row_shape_is_checked() {
        let page = PageRange::rows(4).unwrap();
        let mut weave = Softweave::unwoven(page, 8, InkSet::Monochrome, &planes()).unwrap();
        let mut out: Vec<FlushedPass> = Vec::new();
        assert!(matches!(
            weave.write_row(0, &black_row(16, |_| true), &mut out),
            Err(WeaveError::WidthMismatch { expected: 8, actual: 16 })
        ));
        let color = DitheredRow::new(8, InkSet::FourColor, &planes());
        assert!(matches!(
            weave.write_row(0, &color, &mut out),
            Err(WeaveError::RowLayoutMismatch)
        ));
    }

    #[test]
    fn test_oversampled_phases_split_columns() {
        let g = WeaveGeometry::new(2, 4, 2, WeaveStrategy::ZigZag).unwrap();
        let page = PageRange::rows(12).unwrap();
        let mut weave = Softweave::new(g, page, 16, InkSet::Monochrome, &planes()).unwrap();
        assert_eq!(weave.phase_width(), 8);
        let mut out: Vec<FlushedPass> = Vec::new();
        for row in 0..12 {
            weave
                .write_row(row, &black_row(16, |x| x % 2 == 0), &mut out)
                .unwrap();
        }
        weave.finish(&mut out).unwrap();

        for pass in &out {
            let rows = pass.plane_rows(Channel::K, 0).unwrap();
            let printed: Vec<&Vec<u8>> = rows.iter().filter(|r| r[0] != 0).collect();
            if pass.subpass == 0 {
                assert!(printed.iter().all(|r| r.as_slice() == [0xFF]));
            } else {
                assert!(printed.is_empty(), "odd columns are empty");
            }
        }
    }

    #[test]
    fn test_passes_flush_in_order_without_gaps() {
        let g = WeaveGeometry::new(6, 48, 1, WeaveStrategy::ZigZag).unwrap();
        let page = PageRange::new(5, 600, 640).unwrap();
        let mut weave = Softweave::new(g, page, 8, InkSet::Monochrome, &planes()).unwrap();
        let mut out: Vec<FlushedPass> = Vec::new();
        for row in (5..=600).step_by(3) {
            weave.write_row(row, &black_row(8, |_| true), &mut out).unwrap();
            assert!(weave.open_passes() <= weave.pass_map().window());
        }
        weave.finish(&mut out).unwrap();
        let numbers: Vec<i64> = out.iter().map(|p| p.pass).collect();
        let expected: Vec<i64> =
            (weave.pass_map().first_premapped_pass()..weave.pass_map().first_unused_pass()).collect();
        assert_eq!(numbers, expected);
    }
}
