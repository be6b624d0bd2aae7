//! Test fixtures and constants.

use std::path::{Path, PathBuf};

use inkweave::models::JobConfig;

/// Job files used by the tests
pub mod jobs {
    /// Small CMYK job with a woven 8-nozzle head
    pub const WOVEN_CMYK: &str = r#"
ink_set: four_color
dither:
  algorithm: hybrid-floyd
  seed: 42
head:
  jets: 8
  separation: 4
  strategy: zigzag
page:
  first_row: 3
  length: 80
image:
  width: 48
  height: 60
  pattern: ramp
"#;

    /// Black-only line art through the hard threshold
    pub const LINE_ART: &str = r#"
ink_set: monochrome
image_type: monochrome
dither:
  seed: 1
head:
  jets: 12
  separation: 3
  oversample: 2
image:
  width: 64
  height: 48
  pattern: checker
"#;

    /// Six-color job with light inks and two dot sizes
    pub const PHOTO: &str = r#"
ink_set: six_color
resolution:
  x_dpi: 1440
  y_dpi: 720
dither:
  algorithm: adaptive-random
  seed: 5
  dot_levels: [0.5, 1.0]
  light_inks:
    cyan: 0.3
    magenta: 0.3
head:
  jets: 16
  separation: 8
  oversample: 2
  strategy: staggered-zigzag
image:
  width: 40
  height: 50
  output_width: 80
  pattern: gradient
"#;

    /// No weaving: one pass per row
    pub const UNWOVEN: &str = r#"
ink_set: three_color
dither:
  algorithm: ordered
  seed: 9
head:
  weave: false
image:
  width: 32
  height: 20
  pattern: color_bars
"#;
}

/// Write `yaml` into `dir` and return the file path
pub fn write_job(dir: &Path, name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, yaml).expect("Failed to write job file");
    path
}

/// Parse a job fixture
pub fn job(yaml: &str) -> JobConfig {
    JobConfig::from_yaml(yaml).expect("Fixture job must be valid")
}
