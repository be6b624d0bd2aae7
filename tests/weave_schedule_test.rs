//! Pass schedules across head geometries, checked through the public API.

mod common;

use inkjet_raster::weave::FlushedPass;
use inkjet_raster::{
    DitherAlgorithm, InkSet, PageRange, PassMap, RasterPipeline, RowInput, WeaveGeometry,
    WeaveStrategy,
};
use inkweave::rendering::PreviewCanvas;
use inkweave::services::PassLog;
use pretty_assertions::assert_eq;

/// (separation, jets, oversample)
const HEADS: [(usize, usize, usize); 6] = [
    (1, 1, 1),
    (4, 12, 1),
    (6, 48, 1),
    (8, 32, 2),
    (3, 12, 4),
    (2, 96, 1),
];

#[test]
fn test_every_row_printed_once_per_phase() {
    for (separation, jets, oversample) in HEADS {
        for strategy in WeaveStrategy::ALL {
            let geometry = WeaveGeometry::new(separation, jets, oversample, strategy).unwrap();
            let page = PageRange::new(5, 140, 150).unwrap();
            let mut pipeline = RasterPipeline::builder(16)
                .ink_set(InkSet::Monochrome)
                .algorithm(DitherAlgorithm::Ordered)
                .weave(geometry, page)
                .build()
                .unwrap();
            let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
            let black = vec![65535u16; 16];
            for row in 5..=140 {
                pipeline
                    .write_row(row, RowInput::Gray(&black), &mut canvas)
                    .unwrap();
            }
            pipeline.finish(&mut canvas).unwrap();

            assert!(
                canvas.is_fully_covered(),
                "S={separation} J={jets} H={oversample} {strategy}: {:?}",
                canvas.row_hits()
            );
            for row in 5..=140 {
                for x in 0..16 {
                    assert_eq!(canvas.dot(inkjet_raster::Channel::K, x, row), 1);
                }
            }
        }
    }
}

#[test]
fn test_schedule_log_matches_emitted_passes() {
    let geometry = WeaveGeometry::new(6, 48, 1, WeaveStrategy::ZigZag).unwrap();
    let page = PageRange::new(0, 299, 300).unwrap();
    let map = PassMap::new(geometry.clone(), page).unwrap();
    let schedule = PassLog::from_map(&map);

    let mut pipeline = RasterPipeline::builder(8)
        .ink_set(InkSet::Monochrome)
        .weave(geometry, page)
        .build()
        .unwrap();
    let mut passes: Vec<FlushedPass> = Vec::new();
    let blank = vec![0u16; 8];
    for row in 0..300 {
        pipeline
            .write_row(row, RowInput::Gray(&blank), &mut passes)
            .unwrap();
    }
    pipeline.finish(&mut passes).unwrap();

    common::assert_consecutive(&passes);
    common::assert_advances(&passes);
    let scheduled: Vec<(i64, i64, usize)> = schedule
        .passes
        .iter()
        .map(|p| (p.pass, p.start_row, p.nozzles_used))
        .collect();
    let emitted: Vec<(i64, i64, usize)> = passes
        .iter()
        .map(|p| (p.pass, p.start_row, p.nozzles_used))
        .collect();
    assert_eq!(scheduled, emitted);
}

#[test]
fn test_schedule_json_shape() {
    let geometry = WeaveGeometry::new(4, 16, 1, WeaveStrategy::Ascending).unwrap();
    let map = PassMap::new(geometry, PageRange::rows(64).unwrap()).unwrap();
    let log = PassLog::from_map(&map);

    let json = serde_json::to_value(&log).unwrap();
    let passes = json["passes"].as_array().unwrap();
    assert_eq!(passes.len(), map.len());
    assert_eq!(passes[0]["pass"].as_i64(), Some(map.first_premapped_pass()));
    assert!(passes[0]["dots"].is_null(), "schedules carry no dot counts");
}
