//! Inkweave - dither and softweave raster jobs for multi-nozzle inkjet heads
//!
//! Loads a YAML job, generates its source rows, runs them through the
//! `inkjet-raster` pipeline and writes the passes to a dump file and an
//! optional PNG preview. This library exposes modules for integration
//! testing.

pub mod error;
pub mod models;
pub mod rendering;
pub mod services;
