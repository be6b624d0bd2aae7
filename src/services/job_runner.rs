use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use inkjet_raster::{
    Channel, DitherColor, DitherOptions, PassEmitter, Randomizers, RasterPipeline, RowInput,
};
use serde::Serialize;

use crate::error::JobError;
use crate::models::JobConfig;
use crate::rendering::{PreviewCanvas, RowSource, TestChart, ToneLut};
use crate::services::pass_writer::{DumpHeader, PassDumpWriter, Tee};

/// What a finished job reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub width: usize,
    pub rows: usize,
    pub blank_rows: usize,
    pub passes: usize,
    pub seed: u64,
    /// Packed pass bytes written to the dump, if one was written.
    pub data_bytes: Option<u64>,
}

/// Runs one [`JobConfig`] through the dither and weave pipeline.
#[derive(Debug, Clone)]
pub struct JobRunner {
    config: JobConfig,
    seed: u64,
}

impl JobRunner {
    pub fn new(config: JobConfig) -> Self {
        let seed = config.dither.seed.unwrap_or_else(rand::random);
        Self { config, seed }
    }

    #[inline]
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn options(&self) -> DitherOptions {
        let dither = &self.config.dither;
        let r = dither.randomizers;
        DitherOptions {
            density: self.config.effective_density(),
            ink_spread: self.config.ink_spread(),
            black_lower: dither.black_lower,
            black_upper: dither.black_upper,
            randomizers: Randomizers {
                c: r.c,
                m: r.m,
                y: r.y,
                k: r.k,
            },
            transition: dither.transition,
            adaptive_divisor: dither.adaptive_divisor,
            max_ink: dither.max_ink.map(|m| (m.levels, m.fraction)),
        }
    }

    /// Configure a pipeline for this job.
    pub fn build_pipeline(&self) -> Result<RasterPipeline, JobError> {
        let config = &self.config;
        let resolution = config.resolution;
        let ink_set = config.ink_set();
        let mut builder = RasterPipeline::builder(config.output_width())
            .ink_set(ink_set)
            .algorithm(config.algorithm()?)
            .aspect(resolution.x_dpi, resolution.y_dpi)
            .options(self.options())
            .seed(self.seed);

        if !config.dither.dot_levels.is_empty() {
            let color = DitherColor::from_levels(&config.dither.dot_levels, config.dither.density)?;
            for &channel in [Channel::K, Channel::C, Channel::M, Channel::Y]
                .iter()
                .filter(|&&c| ink_set.has(c))
            {
                builder = builder.ranges(channel, color.clone());
            }
        }
        if let Some(light) = config.dither.light_inks {
            builder = builder.light_inks(light.cyan, light.magenta, light.density);
        }

        let page = config.page_range()?;
        builder = match config.geometry()? {
            Some(geometry) => builder.weave(geometry, page),
            None => builder.page(page),
        };
        Ok(builder.build()?)
    }

    /// Feed every image row through `pipeline` into `emitter`.
    pub fn execute<E: PassEmitter + ?Sized>(
        &self,
        pipeline: &mut RasterPipeline,
        emitter: &mut E,
    ) -> Result<JobReport, JobError> {
        let config = &self.config;
        let width = config.output_width();
        let lut = ToneLut::compute(config.color.brightness, config.color.contrast, config.color.gamma);
        let mut source = RowSource::new(TestChart::from_config(&config.image), lut, width);
        let first_row = pipeline.pass_map().page().first_row;
        let hard_threshold = config.uses_hard_threshold();
        let monochrome = config.ink_set().is_monochrome();

        tracing::info!(
            width,
            rows = source.rows(),
            first_row,
            seed = self.seed,
            algorithm = %pipeline.engine().algorithm(),
            "Starting job"
        );

        for y in 0..source.rows() {
            source.load_row(y);
            let row = first_row + y;
            if hard_threshold {
                pipeline.write_monochrome_row(row, source.gray(), emitter)?;
            } else if monochrome {
                pipeline.write_row(row, RowInput::Gray(source.gray()), emitter)?;
            } else {
                pipeline.write_row(row, source.cmy(), emitter)?;
            }
            if (y + 1) % 256 == 0 {
                tracing::debug!(row, "progress");
            }
        }

        let summary = pipeline.finish(emitter)?;
        tracing::info!(
            rows = summary.rows,
            blank_rows = summary.blank_rows,
            passes = summary.passes,
            "Job finished"
        );
        Ok(JobReport {
            width,
            rows: summary.rows,
            blank_rows: summary.blank_rows,
            passes: summary.passes,
            seed: self.seed,
            data_bytes: None,
        })
    }

    /// Run the job into any emitter.
    pub fn run<E: PassEmitter + ?Sized>(&self, emitter: &mut E) -> Result<JobReport, JobError> {
        let mut pipeline = self.build_pipeline()?;
        self.execute(&mut pipeline, emitter)
    }

    /// Run the job into a pass dump at `output`, optionally also rendering
    /// a PNG preview of the rebuilt page.
    pub fn render_to_file(&self, output: &Path, preview: Option<&Path>) -> Result<JobReport, JobError> {
        let mut pipeline = self.build_pipeline()?;
        let file = BufWriter::new(File::create(output)?);
        let mut writer = PassDumpWriter::new(file, DumpHeader::for_pipeline(&pipeline))?;

        let mut report = match preview {
            Some(path) => {
                let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
                let report = self.execute(&mut pipeline, &mut Tee(&mut writer, &mut canvas))?;
                canvas.write_png(path)?;
                report
            }
            None => self.execute(&mut pipeline, &mut writer)?,
        };

        let data_bytes = writer.data_bytes();
        let passes = writer.passes();
        writer.finish()?;
        tracing::info!(path = %output.display(), passes, data_bytes, "Wrote pass dump");
        report.data_bytes = Some(data_bytes);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageType, InkSetKind, Pattern};
    use inkjet_raster::weave::FlushedPass;
    use inkjet_raster::{DitherAlgorithm, InkSet};

    fn small_job() -> JobConfig {
        let mut config = JobConfig::default();
        config.image.width = 64;
        config.image.height = 40;
        config.head.jets = 8;
        config.head.separation = 4;
        config.dither.seed = Some(11);
        config
    }

    #[test]
    fn test_fixed_seed_is_kept() {
        let runner = JobRunner::new(small_job());
        assert_eq!(runner.seed(), 11);
    }

    #[test]
    fn test_pipeline_follows_config() {
        let mut config = small_job();
        config.ink_set = InkSetKind::Monochrome;
        config.dither.algorithm = "fast".to_string();
        config.image.output_width = Some(96);
        let pipeline = JobRunner::new(config).build_pipeline().unwrap();

        let engine = pipeline.engine();
        assert_eq!(engine.width(), 96);
        assert_eq!(engine.ink_set(), InkSet::Monochrome);
        assert_eq!(engine.algorithm(), DitherAlgorithm::Fast);
        assert_eq!(engine.options().ink_spread, 14);
        assert_eq!(pipeline.pass_map().geometry().jets(), 8);
    }

    #[test]
    fn test_dot_levels_add_planes() {
        let mut config = small_job();
        config.dither.dot_levels = vec![0.3, 0.6, 1.0];
        let pipeline = JobRunner::new(config).build_pipeline().unwrap();
        let planes = pipeline.engine().planes();
        assert_eq!(planes[Channel::C], 2, "three dot sizes need two bits");
        assert_eq!(planes[Channel::K], 2);
    }

    #[test]
    fn test_light_inks_need_six_colors() {
        let mut config = small_job();
        config.dither.light_inks = Some(crate::models::LightInkConfig {
            cyan: 0.3,
            magenta: 0.3,
            density: 1.0,
        });
        let err = JobRunner::new(config.clone()).build_pipeline().unwrap_err();
        assert!(matches!(err, JobError::Raster(_)), "got {err:?}");

        config.ink_set = InkSetKind::SixColor;
        JobRunner::new(config).build_pipeline().unwrap();
    }

    #[test]
    fn test_run_emits_every_pass() {
        let runner = JobRunner::new(small_job());
        let mut passes: Vec<FlushedPass> = Vec::new();
        let report = runner.run(&mut passes).unwrap();
        assert_eq!(report.rows, 40);
        assert_eq!(report.passes, passes.len());
        assert_eq!(report.seed, 11);
        assert!(report.data_bytes.is_none());
    }

    #[test]
    fn test_same_seed_same_passes() {
        let mut config = small_job();
        config.dither.algorithm = "random-floyd".to_string();
        let mut first: Vec<FlushedPass> = Vec::new();
        let mut second: Vec<FlushedPass> = Vec::new();
        JobRunner::new(config.clone()).run(&mut first).unwrap();
        JobRunner::new(config).run(&mut second).unwrap();
        assert_eq!(first, second, "seeded jobs are reproducible");
    }

    #[test]
    fn test_hard_threshold_prints_only_full_black() {
        let mut config = small_job();
        config.ink_set = InkSetKind::Monochrome;
        config.image_type = ImageType::Monochrome;
        config.image.pattern = Pattern::Checker;
        let runner = JobRunner::new(config);
        let mut pipeline = runner.build_pipeline().unwrap();
        let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
        runner.execute(&mut pipeline, &mut canvas).unwrap();

        for y in 0..40 {
            for x in 0..64 {
                let black = (x / 16 + y / 16) % 2 == 0;
                assert_eq!(canvas.dot(Channel::K, x, y) != 0, black, "pixel ({x}, {y})");
            }
        }
    }
}
