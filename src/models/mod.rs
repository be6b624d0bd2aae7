pub mod config;

pub use config::{
    ColorConfig, DitherConfig, HeadConfig, ImageConfig, ImageType, InkSetKind, JobConfig,
    LightInkConfig, MaxInkConfig, PageConfig, Pattern, RandomizerConfig, Resolution,
};
