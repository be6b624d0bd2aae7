//! Assertion helpers for tests.

use inkjet_raster::weave::FlushedPass;
use inkweave::rendering::PreviewCanvas;
use pretty_assertions::assert_eq;

/// Assert bytes are a PNG image
pub fn assert_png(bytes: &[u8]) {
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "Expected PNG image, got {} bytes starting with {:?}",
        bytes.len(),
        &bytes[..8.min(bytes.len())]
    );
}

/// Assert passes arrive numbered consecutively
pub fn assert_consecutive(passes: &[FlushedPass]) {
    for pair in passes.windows(2) {
        assert_eq!(
            pair[1].pass,
            pair[0].pass + 1,
            "Pass {} followed by {}",
            pair[0].pass,
            pair[1].pass
        );
    }
}

/// Assert each advance is the difference of consecutive start rows
pub fn assert_advances(passes: &[FlushedPass]) {
    let mut previous = 0;
    for pass in passes {
        assert_eq!(
            pass.advance,
            pass.start_row - previous,
            "Advance of pass {}",
            pass.pass
        );
        previous = pass.start_row;
    }
}

/// Assert every printed row was visited once per column phase
pub fn assert_fully_covered(canvas: &PreviewCanvas) {
    assert!(
        canvas.is_fully_covered(),
        "Rows not covered exactly once per phase: {:?}",
        canvas.row_hits()
    );
}
