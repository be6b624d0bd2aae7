//! RasterPipeline builder -- the main entry point of the crate.
//!
//! [`RasterPipeline`] couples a [`DitherEngine`] with a [`Softweave`] and
//! streams rows from the caller to a [`PassEmitter`].

use crate::channel::{Channel, InkSet};
use crate::dither::{DitherAlgorithm, DitherColor, DitherEngine, DitherOptions, Randomizers, RowInput};
use crate::matrix::DitherMatrix;
use crate::output::DitheredRow;
use crate::weave::{PageRange, PassEmitter, PassMap, Softweave, WeaveGeometry};

use super::RasterError;

/// Fluent configuration of a [`RasterPipeline`].
///
/// Every setter only records its value; [`build`](Self::build) validates
/// the whole configuration at once, so a pipeline never starts with a
/// partial setup.
///
/// # Example
///
/// ```
/// use inkjet_raster::{DitherAlgorithm, InkSet, PageRange, RasterPipeline, RowInput};
/// use inkjet_raster::weave::FlushedPass;
///
/// let mut pipeline = RasterPipeline::builder(16)
///     .ink_set(InkSet::Monochrome)
///     .algorithm(DitherAlgorithm::Ordered)
///     .page(PageRange::rows(2).unwrap())
///     .build()
///     .unwrap();
///
/// let mut passes: Vec<FlushedPass> = Vec::new();
/// let gray = vec![65535u16; 16];
/// pipeline.write_row(0, RowInput::Gray(&gray), &mut passes).unwrap();
/// pipeline.write_row(1, RowInput::Gray(&gray), &mut passes).unwrap();
/// let summary = pipeline.finish(&mut passes).unwrap();
/// assert_eq!(summary.passes, 2);
/// ```
#[derive(Debug, Clone)]
pub struct RasterPipelineBuilder {
    width: usize,
    ink_set: InkSet,
    algorithm: DitherAlgorithm,
    aspect: (u32, u32),
    options: DitherOptions,
    seed: u64,
    ranges: Vec<(Channel, DitherColor)>,
    light_inks: Option<(f64, f64, f64)>,
    ordered_matrix: Option<DitherMatrix>,
    geometry: Option<WeaveGeometry>,
    page: Option<PageRange>,
}

impl RasterPipelineBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            ink_set: InkSet::default(),
            algorithm: DitherAlgorithm::default(),
            aspect: (1, 1),
            options: DitherOptions::default(),
            seed: 0,
            ranges: Vec::new(),
            light_inks: None,
            ordered_matrix: None,
            geometry: None,
            page: None,
        }
    }

    #[inline]
    pub fn algorithm(mut self, algorithm: DitherAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[inline]
    pub fn ink_set(mut self, ink_set: InkSet) -> Self {
        self.ink_set = ink_set;
        self
    }

    /// Horizontal and vertical resolution; decides the matrix shape.
    #[inline]
    pub fn aspect(mut self, x_dpi: u32, y_dpi: u32) -> Self {
        self.aspect = (x_dpi, y_dpi);
        self
    }

    /// Replace every tuning value at once.
    #[inline]
    pub fn options(mut self, options: DitherOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn density(mut self, density: f64) -> Self {
        self.options.density = density;
        self
    }

    #[inline]
    pub fn ink_spread(mut self, spread: u32) -> Self {
        self.options.ink_spread = spread;
        self
    }

    #[inline]
    pub fn black_lower(mut self, lower: f64) -> Self {
        self.options.black_lower = lower;
        self
    }

    #[inline]
    pub fn black_upper(mut self, upper: f64) -> Self {
        self.options.black_upper = upper;
        self
    }

    #[inline]
    pub fn randomizers(mut self, randomizers: Randomizers) -> Self {
        self.options.randomizers = randomizers;
        self
    }

    #[inline]
    pub fn transition(mut self, exponent: f64) -> Self {
        self.options.transition = exponent;
        self
    }

    #[inline]
    pub fn adaptive_divisor(mut self, divisor: u32) -> Self {
        self.options.adaptive_divisor = divisor;
        self
    }

    #[inline]
    pub fn max_ink(mut self, levels: u32, fraction: f64) -> Self {
        self.options.max_ink = Some((levels, fraction));
        self
    }

    /// Seed of the random thresholds and spread rounding.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Dot-size ranges of one dark channel. Later calls for the same
    /// channel win.
    pub fn ranges(mut self, channel: Channel, color: DitherColor) -> Self {
        self.ranges.retain(|(c, _)| *c != channel);
        self.ranges.push((channel, color));
        self
    }

    /// Light cyan and magenta ink values relative to their dark inks.
    #[inline]
    pub fn light_inks(mut self, c: f64, m: f64, density: f64) -> Self {
        self.light_inks = Some((c, m, density));
        self
    }

    /// Use a custom base threshold matrix instead of the built-in tables.
    #[inline]
    pub fn ordered_matrix(mut self, matrix: DitherMatrix) -> Self {
        self.ordered_matrix = Some(matrix);
        self
    }

    /// Interleave rows over a multi-nozzle head.
    #[inline]
    pub fn weave(mut self, geometry: WeaveGeometry, page: PageRange) -> Self {
        self.geometry = Some(geometry);
        self.page = Some(page);
        self
    }

    /// Print the page without weaving: one pass per row.
    #[inline]
    pub fn page(mut self, page: PageRange) -> Self {
        self.geometry = None;
        self.page = Some(page);
        self
    }

    /// Validate everything and allocate the pipeline.
    pub fn build(self) -> Result<RasterPipeline, RasterError> {
        let page = self.page.ok_or(RasterError::NoPage)?;
        let mut engine = DitherEngine::new(self.width, self.ink_set, self.algorithm, self.seed)?;
        engine.set_options(self.options)?;
        if self.aspect != (1, 1) {
            engine.set_aspect(self.aspect.0, self.aspect.1)?;
        }
        if let Some(matrix) = self.ordered_matrix {
            engine.set_ordered_matrix(matrix);
        }
        for (channel, color) in self.ranges {
            engine.set_ranges(channel, color)?;
        }
        if let Some((c, m, density)) = self.light_inks {
            engine.set_light_inks(c, m, density)?;
        }

        let planes = engine.planes();
        let weave = match self.geometry {
            Some(geometry) => Softweave::new(geometry, page, self.width, self.ink_set, &planes)?,
            None => Softweave::unwoven(page, self.width, self.ink_set, &planes)?,
        };
        let row = engine.new_row();

        tracing::debug!(
            width = self.width,
            ink_set = ?self.ink_set,
            algorithm = %self.algorithm,
            passes = weave.pass_map().len(),
            "raster pipeline built"
        );

        Ok(RasterPipeline {
            engine,
            weave,
            row,
            blank_rows: 0,
        })
    }
}

/// Totals reported by [`RasterPipeline::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub rows: usize,
    pub blank_rows: usize,
    pub passes: usize,
}

/// A configured dither and weave pipeline for one page.
#[derive(Debug, Clone)]
pub struct RasterPipeline {
    engine: DitherEngine,
    weave: Softweave,
    row: DitheredRow,
    blank_rows: usize,
}

impl RasterPipeline {
    pub fn builder(width: usize) -> RasterPipelineBuilder {
        RasterPipelineBuilder::new(width)
    }

    #[inline]
    pub fn engine(&self) -> &DitherEngine {
        &self.engine
    }

    #[inline]
    pub fn pass_map(&self) -> &PassMap {
        self.weave.pass_map()
    }

    /// The most recently dithered row.
    #[inline]
    pub fn last_row(&self) -> &DitheredRow {
        &self.row
    }

    /// Dither page row `row` and hand it to the weave.
    ///
    /// Rows off the page or out of order are rejected before dithering,
    /// so a failed call leaves the pipeline unchanged.
    pub fn write_row<E: PassEmitter + ?Sized>(
        &mut self,
        row: usize,
        input: RowInput<'_>,
        emitter: &mut E,
    ) -> Result<(), RasterError> {
        self.weave.check_row(row)?;
        self.engine.dither_row(row, input, &mut self.row)?;
        self.place(row, emitter)
    }

    /// Hard-threshold line art: only full black prints.
    pub fn write_monochrome_row<E: PassEmitter + ?Sized>(
        &mut self,
        row: usize,
        k: &[u16],
        emitter: &mut E,
    ) -> Result<(), RasterError> {
        self.weave.check_row(row)?;
        self.engine.dither_monochrome(row, k, &mut self.row)?;
        self.place(row, emitter)
    }

    fn place<E: PassEmitter + ?Sized>(&mut self, row: usize, emitter: &mut E) -> Result<(), RasterError> {
        if self.row.is_blank() {
            self.blank_rows += 1;
        }
        self.weave.write_row(row, &self.row, emitter)?;
        Ok(())
    }

    /// Flush the remaining passes.
    pub fn finish<E: PassEmitter + ?Sized>(&mut self, emitter: &mut E) -> Result<PipelineSummary, RasterError> {
        self.weave.finish(emitter)?;
        let summary = PipelineSummary {
            rows: self.weave.rows_written(),
            blank_rows: self.blank_rows,
            passes: self.weave.pass_map().len(),
        };
        tracing::debug!(rows = summary.rows, passes = summary.passes, "page finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dither::DitherError;
    use crate::weave::{FlushedPass, WeaveError, WeaveStrategy};

    #[test]
    fn test_build_requires_page() {
        let err = RasterPipeline::builder(8).build().unwrap_err();
        assert!(matches!(err, RasterError::NoPage));
    }

    #[test]
    fn test_build_validates_options() {
        let err = RasterPipeline::builder(8)
            .page(PageRange::rows(4).unwrap())
            .density(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RasterError::Dither(DitherError::InvalidParameter { name: "density", .. })
        ));
    }

    #[test]
    fn test_light_inks_need_light_channels() {
        let err = RasterPipeline::builder(8)
            .ink_set(InkSet::FourColor)
            .light_inks(0.25, 0.25, 1.0)
            .page(PageRange::rows(4).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RasterError::Dither(DitherError::ChannelNotInInkSet(Channel::LightC))
        ));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let err = RasterPipeline::builder(0)
            .page(PageRange::rows(4).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, RasterError::Dither(DitherError::ZeroWidth)));
    }

    #[test]
    fn test_woven_page_flushes_every_pass() {
        let geometry = WeaveGeometry::new(4, 8, 1, WeaveStrategy::ZigZag).unwrap();
        let mut pipeline = RasterPipeline::builder(32)
            .ink_set(InkSet::FourColor)
            .algorithm(DitherAlgorithm::Ordered)
            .weave(geometry, PageRange::rows(40).unwrap())
            .build()
            .unwrap();
        let mut passes: Vec<FlushedPass> = Vec::new();
        let c = vec![20000u16; 32];
        let m = vec![0u16; 32];
        let y = vec![40000u16; 32];
        for row in 0..40 {
            pipeline
                .write_row(row, RowInput::Cmy { c: &c, m: &m, y: &y }, &mut passes)
                .unwrap();
        }
        let summary = pipeline.finish(&mut passes).unwrap();
        assert_eq!(summary.rows, 40);
        assert_eq!(passes.len(), summary.passes);
        assert!(passes.iter().all(|p| p.channels.len() == 4));
        assert!(passes.iter().any(|p| !p.is_blank().unwrap()));
    }

    #[test]
    fn test_emitter_failure_is_reported() {
        struct Broken;
        impl PassEmitter for Broken {
            fn emit_pass(&mut self, _: &FlushedPass) -> std::io::Result<()> {
                Err(std::io::Error::other("disk full"))
            }
        }
        let mut pipeline = RasterPipeline::builder(8)
            .ink_set(InkSet::Monochrome)
            .page(PageRange::rows(1).unwrap())
            .build()
            .unwrap();
        let err = pipeline
            .write_row(0, RowInput::Gray(&[0; 8]), &mut Broken)
            .unwrap_err();
        assert!(matches!(err, RasterError::Emit(_)));
    }

    #[test]
    fn test_rows_out_of_order_are_rejected() {
        let mut pipeline = RasterPipeline::builder(8)
            .ink_set(InkSet::Monochrome)
            .algorithm(DitherAlgorithm::Fast)
            .page(PageRange::rows(4).unwrap())
            .build()
            .unwrap();
        let mut passes: Vec<FlushedPass> = Vec::new();
        pipeline.write_row(2, RowInput::Gray(&[0; 8]), &mut passes).unwrap();
        let err = pipeline
            .write_row(1, RowInput::Gray(&[0; 8]), &mut passes)
            .unwrap_err();
        assert!(matches!(
            err,
            RasterError::Weave(WeaveError::RowOutOfOrder { row: 1, previous: 2 })
        ));
    }

    #[test]
    fn test_rejected_rows_leave_no_trace() {
        let build = || {
            RasterPipeline::builder(16)
                .ink_set(InkSet::Monochrome)
                .algorithm(DitherAlgorithm::HybridFloyd)
                .seed(5)
                .page(PageRange::rows(4).unwrap())
                .build()
                .unwrap()
        };
        let gray: Vec<u16> = (0..16).map(|x| x * 4000).collect();
        let blank = [0u16; 16];

        let mut clean = build();
        let mut clean_passes: Vec<FlushedPass> = Vec::new();
        for row in 0..4 {
            clean.write_row(row, RowInput::Gray(&gray), &mut clean_passes).unwrap();
        }
        let clean_summary = clean.finish(&mut clean_passes).unwrap();

        let mut retried = build();
        let mut passes: Vec<FlushedPass> = Vec::new();
        retried.write_row(0, RowInput::Gray(&gray), &mut passes).unwrap();
        retried.write_row(1, RowInput::Gray(&gray), &mut passes).unwrap();
        let empty_run = retried.engine().empty_run();
        assert!(matches!(
            retried.write_row(1, RowInput::Gray(&blank), &mut passes),
            Err(RasterError::Weave(WeaveError::RowOutOfOrder { row: 1, previous: 1 }))
        ));
        assert!(matches!(
            retried.write_row(9, RowInput::Gray(&blank), &mut passes),
            Err(RasterError::Weave(WeaveError::RowOutsidePage { row: 9, .. }))
        ));
        assert!(retried.write_monochrome_row(0, &blank, &mut passes).is_err());
        assert_eq!(retried.engine().empty_run(), empty_run);
        for row in 2..4 {
            retried.write_row(row, RowInput::Gray(&gray), &mut passes).unwrap();
        }
        let summary = retried.finish(&mut passes).unwrap();

        assert_eq!(summary, clean_summary);
        assert_eq!(summary.blank_rows, 0);
        assert_eq!(passes, clean_passes);
    }
}
