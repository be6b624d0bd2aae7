//! End-to-end job tests: YAML job in, pass dump and preview out.

mod common;

use common::fixtures::{self, jobs};
use inkjet_raster::weave::FlushedPass;
use inkjet_raster::Channel;
use inkweave::error::{ConfigError, JobError};
use inkweave::models::JobConfig;
use inkweave::rendering::PreviewCanvas;
use inkweave::services::{read_pass_dump, JobRunner, PassLog};
use pretty_assertions::assert_eq;

#[test]
fn test_render_writes_dump_and_preview() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = fixtures::write_job(dir.path(), "job.yaml", jobs::WOVEN_CMYK);
    let output = dir.path().join("passes.iwp");
    let preview = dir.path().join("preview.png");

    let config = JobConfig::load(&job_path).unwrap();
    let report = JobRunner::new(config)
        .render_to_file(&output, Some(&preview))
        .unwrap();

    assert_eq!(report.rows, 60);
    assert_eq!(report.seed, 42);
    assert!(report.data_bytes.unwrap() > 0, "ramp prints ink");

    let png = std::fs::read(&preview).unwrap();
    common::assert_png(&png);

    let dump = read_pass_dump(std::fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(dump.passes.len(), report.passes);
    assert_eq!(dump.header.page.first_row, 3);
    assert_eq!(dump.header.page.page_length, 80);
    common::assert_consecutive(&dump.passes);
    common::assert_advances(&dump.passes);
}

#[test]
fn test_dump_matches_direct_passes() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("passes.iwp");

    let runner = JobRunner::new(fixtures::job(jobs::WOVEN_CMYK));
    runner.render_to_file(&output, None).unwrap();

    let mut direct: Vec<FlushedPass> = Vec::new();
    JobRunner::new(fixtures::job(jobs::WOVEN_CMYK))
        .run(&mut direct)
        .unwrap();

    let dump = read_pass_dump(std::fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(dump.passes, direct, "seeded job writes the same passes");
}

#[test]
fn test_line_art_rebuilds_exactly() {
    let runner = JobRunner::new(fixtures::job(jobs::LINE_ART));
    let mut pipeline = runner.build_pipeline().unwrap();
    let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
    runner.execute(&mut pipeline, &mut canvas).unwrap();

    common::assert_fully_covered(&canvas);
    for y in 0..48 {
        for x in 0..64 {
            let black = (x / 16 + y / 16) % 2 == 0;
            assert_eq!(
                canvas.dot(Channel::K, x, y) != 0,
                black,
                "pixel ({}, {})",
                x,
                y
            );
        }
    }
}

#[test]
fn test_photo_job_uses_light_inks() {
    let runner = JobRunner::new(fixtures::job(jobs::PHOTO));
    let mut pipeline = runner.build_pipeline().unwrap();
    let planes = pipeline.engine().planes();
    assert_eq!(planes[Channel::K], 2, "two dot sizes");
    assert_eq!(pipeline.engine().width(), 80);

    let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
    let report = runner.execute(&mut pipeline, &mut canvas).unwrap();
    assert_eq!(report.rows, 50);
    common::assert_fully_covered(&canvas);

    let light = (0..50)
        .flat_map(|y| (0..80).map(move |x| (x, y)))
        .filter(|&(x, y)| canvas.dot(Channel::LightC, x, y) != 0)
        .count();
    assert!(light > 0, "light cyan prints in the gradient");
}

#[test]
fn test_unwoven_job_has_one_pass_per_row() {
    let runner = JobRunner::new(fixtures::job(jobs::UNWOVEN));
    let mut log = PassLog::new();
    let report = runner.run(&mut log).unwrap();

    assert_eq!(report.passes, 20);
    assert_eq!(log.len(), 20);
    assert!(log.passes.iter().all(|p| p.nozzles_used == 1));
    let starts: Vec<i64> = log.passes.iter().map(|p| p.start_row).collect();
    assert_eq!(starts, (0..20).collect::<Vec<i64>>());
}

#[test]
fn test_invalid_job_file() {
    let dir = tempfile::tempdir().unwrap();
    let job_path = fixtures::write_job(dir.path(), "bad.yaml", "head:\n  jets: 0\n");
    let err = JobConfig::load(&job_path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "head", .. }), "{err}");
}

#[test]
fn test_unwritable_output_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing").join("passes.iwp");
    let err = JobRunner::new(fixtures::job(jobs::UNWOVEN))
        .render_to_file(&output, None)
        .unwrap_err();
    assert!(matches!(err, JobError::Io(_)), "{err}");
}

#[test]
fn test_sample_jobs_are_valid() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("jobs");
    let mut found = 0;
    for entry in std::fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let config = JobConfig::load(&path)
            .unwrap_or_else(|e| panic!("{} should load: {}", path.display(), e));
        JobRunner::new(config)
            .build_pipeline()
            .unwrap_or_else(|e| panic!("{} should build: {}", path.display(), e));
        found += 1;
    }
    assert!(found >= 2, "Expected sample jobs in {}", dir.display());
}
