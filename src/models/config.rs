use std::path::Path;
use std::str::FromStr;

use inkjet_raster::{DitherAlgorithm, InkSet, PageRange, WeaveGeometry, WeaveStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One print job loaded from a YAML file.
///
/// Every section may be omitted; the defaults describe a runnable job
/// that prints a gray gradient through a 48-nozzle head.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default)]
    pub resolution: Resolution,

    #[serde(default)]
    pub ink_set: InkSetKind,

    #[serde(default)]
    pub image_type: ImageType,

    #[serde(default)]
    pub dither: DitherConfig,

    #[serde(default)]
    pub head: HeadConfig,

    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub color: ColorConfig,
}

/// Printer resolution in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resolution {
    #[serde(default = "default_dpi")]
    pub x_dpi: u32,

    #[serde(default = "default_dpi")]
    pub y_dpi: u32,
}

fn default_dpi() -> u32 {
    720
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            x_dpi: default_dpi(),
            y_dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InkSetKind {
    Monochrome,
    ThreeColor,
    #[default]
    FourColor,
    SixColor,
}

impl From<InkSetKind> for InkSet {
    fn from(kind: InkSetKind) -> Self {
        match kind {
            InkSetKind::Monochrome => InkSet::Monochrome,
            InkSetKind::ThreeColor => InkSet::ThreeColor,
            InkSetKind::FourColor => InkSet::FourColor,
            InkSetKind::SixColor => InkSet::SixColor,
        }
    }
}

/// What kind of picture is printed; picks the default ink spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    LineArt,
    SolidTone,
    #[default]
    Continuous,
    /// Hard black and white; only full black prints.
    Monochrome,
}

impl ImageType {
    pub fn default_ink_spread(self) -> u32 {
        match self {
            ImageType::LineArt | ImageType::Monochrome => 19,
            ImageType::SolidTone => 15,
            ImageType::Continuous => 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RandomizerConfig {
    #[serde(default = "default_randomizer")]
    pub c: f64,
    #[serde(default = "default_randomizer")]
    pub m: f64,
    #[serde(default = "default_randomizer")]
    pub y: f64,
    #[serde(default = "default_randomizer")]
    pub k: f64,
}

fn default_randomizer() -> f64 {
    1.0
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            m: 1.0,
            y: 1.0,
            k: 1.0,
        }
    }
}

/// Cap on the summed ink of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MaxInkConfig {
    pub levels: u32,
    pub fraction: f64,
}

/// Light cyan and magenta strength relative to the dark inks.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LightInkConfig {
    #[serde(default)]
    pub cyan: f64,
    #[serde(default)]
    pub magenta: f64,
    #[serde(default = "default_density")]
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DitherConfig {
    /// Display name or short alias, e.g. `adaptive-hybrid`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_density")]
    pub density: f64,

    /// Defaults to the image type's spread.
    #[serde(default)]
    pub ink_spread: Option<u32>,

    #[serde(default = "default_black_lower")]
    pub black_lower: f64,

    #[serde(default = "default_black_upper")]
    pub black_upper: f64,

    #[serde(default = "default_transition")]
    pub transition: f64,

    #[serde(default)]
    pub randomizers: RandomizerConfig,

    #[serde(default = "default_adaptive_divisor")]
    pub adaptive_divisor: u32,

    #[serde(default)]
    pub max_ink: Option<MaxInkConfig>,

    /// Fixed seed for reproducible output; a random one is drawn otherwise.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Relative dot sizes of a variable-dot head, smallest first. Empty
    /// means one dot size.
    #[serde(default)]
    pub dot_levels: Vec<f64>,

    #[serde(default)]
    pub light_inks: Option<LightInkConfig>,
}

fn default_algorithm() -> String {
    DitherAlgorithm::AdaptiveHybrid.alias().to_string()
}

fn default_density() -> f64 {
    1.0
}

fn default_black_lower() -> f64 {
    0.4
}

fn default_black_upper() -> f64 {
    0.7
}

fn default_transition() -> f64 {
    0.6
}

fn default_adaptive_divisor() -> u32 {
    2
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            density: default_density(),
            ink_spread: None,
            black_lower: default_black_lower(),
            black_upper: default_black_upper(),
            transition: default_transition(),
            randomizers: RandomizerConfig::default(),
            adaptive_divisor: default_adaptive_divisor(),
            max_ink: None,
            seed: None,
            dot_levels: Vec::new(),
            light_inks: None,
        }
    }
}

/// Print head layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeadConfig {
    #[serde(default = "default_jets")]
    pub jets: usize,

    /// Nozzle pitch in rows.
    #[serde(default = "default_separation")]
    pub separation: usize,

    #[serde(default = "default_oversample")]
    pub oversample: usize,

    /// Weave strategy name or numeric id.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// `false` prints one row per pass.
    #[serde(default = "default_weave")]
    pub weave: bool,
}

fn default_jets() -> usize {
    48
}

fn default_separation() -> usize {
    6
}

fn default_oversample() -> usize {
    1
}

fn default_strategy() -> String {
    WeaveStrategy::default().name().to_string()
}

fn default_weave() -> bool {
    true
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            jets: default_jets(),
            separation: default_separation(),
            oversample: default_oversample(),
            strategy: default_strategy(),
            weave: default_weave(),
        }
    }
}

/// Where the image lands on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PageConfig {
    /// Page row of the first image row.
    #[serde(default)]
    pub first_row: usize,

    /// Page length in rows; defaults to just fitting the image.
    #[serde(default)]
    pub length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    #[default]
    Gradient,
    Ramp,
    Steps,
    Solid,
    Checker,
    ColorBars,
}

/// The generated source image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ImageConfig {
    #[serde(default = "default_width")]
    pub width: usize,

    #[serde(default = "default_height")]
    pub height: usize,

    /// Printed width in dots; the source is resampled to it.
    #[serde(default)]
    pub output_width: Option<usize>,

    #[serde(default)]
    pub pattern: Pattern,

    /// Ink coverage of the `solid` pattern.
    #[serde(default = "default_level")]
    pub level: f64,
}

fn default_width() -> usize {
    720
}

fn default_height() -> usize {
    240
}

fn default_level() -> f64 {
    0.5
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            output_width: None,
            pattern: Pattern::default(),
            level: default_level(),
        }
    }
}

/// Tone correction applied to every source sample.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ColorConfig {
    #[serde(default = "default_unity")]
    pub brightness: f64,

    #[serde(default = "default_unity")]
    pub contrast: f64,

    #[serde(default = "default_unity")]
    pub gamma: f64,
}

fn default_unity() -> f64 {
    1.0
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            gamma: 1.0,
        }
    }
}

impl JobConfig {
    /// Read, parse and validate a job file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), %source, "Failed to read job config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::info!(
            path = %path.display(),
            width = config.output_width(),
            height = config.image.height,
            ink_set = ?config.ink_set,
            algorithm = %config.dither.algorithm,
            "Loaded job config"
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| {
            tracing::warn!(%e, "Failed to parse job config");
            ConfigError::Parse(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.x_dpi == 0 || self.resolution.y_dpi == 0 {
            return Err(ConfigError::invalid("resolution", "dpi must be non-zero"));
        }
        if self.image.width == 0 || self.image.height == 0 {
            return Err(ConfigError::invalid("image", "width and height must be non-zero"));
        }
        if self.output_width() == 0 {
            return Err(ConfigError::invalid("image.output_width", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.image.level) {
            return Err(ConfigError::invalid("image.level", "must lie in 0..=1"));
        }
        for (field, value) in [
            ("color.brightness", self.color.brightness),
            ("color.contrast", self.color.contrast),
            ("color.gamma", self.color.gamma),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, "must be a positive number"));
            }
        }
        self.algorithm()?;
        self.strategy()?;
        self.geometry()?;
        self.page_range()?;
        if self.image_type == ImageType::Monochrome && !InkSet::from(self.ink_set).has_black() {
            return Err(ConfigError::invalid(
                "image_type",
                "monochrome printing needs black ink",
            ));
        }
        Ok(())
    }

    pub fn algorithm(&self) -> Result<DitherAlgorithm, ConfigError> {
        DitherAlgorithm::from_str(&self.dither.algorithm)
            .map_err(|e| ConfigError::invalid("dither.algorithm", e.to_string()))
    }

    pub fn strategy(&self) -> Result<WeaveStrategy, ConfigError> {
        WeaveStrategy::from_str(&self.head.strategy)
            .map_err(|e| ConfigError::invalid("head.strategy", e.to_string()))
    }

    #[inline]
    pub fn ink_set(&self) -> InkSet {
        self.ink_set.into()
    }

    pub fn ink_spread(&self) -> u32 {
        self.dither
            .ink_spread
            .unwrap_or_else(|| self.image_type.default_ink_spread())
    }

    /// Configured density scaled down on heads with coarser vertical
    /// resolution.
    pub fn effective_density(&self) -> f64 {
        let scale = self.resolution.y_dpi as f64 / self.resolution.x_dpi as f64;
        self.dither.density * scale.min(1.0)
    }

    #[inline]
    pub fn output_width(&self) -> usize {
        self.image.output_width.unwrap_or(self.image.width)
    }

    /// Line art on a black-only printer bypasses the dither.
    pub fn uses_hard_threshold(&self) -> bool {
        self.image_type == ImageType::Monochrome && self.ink_set == InkSetKind::Monochrome
    }

    pub fn page_range(&self) -> Result<PageRange, ConfigError> {
        let first_row = self.page.first_row;
        let last_row = first_row + self.image.height.saturating_sub(1);
        let length = self.page.length.unwrap_or(last_row + 1);
        PageRange::new(first_row, last_row, length)
            .map_err(|e| ConfigError::invalid("page", e.to_string()))
    }

    /// Head geometry, or `None` when weaving is switched off.
    pub fn geometry(&self) -> Result<Option<WeaveGeometry>, ConfigError> {
        if !self.head.weave {
            return Ok(None);
        }
        let head = &self.head;
        WeaveGeometry::new(head.separation, head.jets, head.oversample, self.strategy()?)
            .map(Some)
            .map_err(|e| ConfigError::invalid("head", e.to_string()))
    }
}
