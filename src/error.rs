use std::path::PathBuf;

use inkjet_raster::weave::PackError;
use inkjet_raster::{DitherError, RasterError, WeaveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse job config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Dither error: {0}")]
    Dither(#[from] DitherError),

    #[error("Weave error: {0}")]
    Weave(#[from] WeaveError),

    #[error("Corrupt pass data: {0}")]
    Pack(#[from] PackError),

    #[error("Invalid pass dump: {0}")]
    Dump(String),

    #[error("PNG encode error: {0}")]
    PngEncode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_invalid() {
        let error = ConfigError::invalid("head.jets", "must be at least 1");
        assert_eq!(
            error.to_string(),
            "Invalid value for head.jets: must be at least 1"
        );
    }

    #[test]
    fn test_config_error_read_keeps_source() {
        use std::error::Error as _;

        let error = ConfigError::Read {
            path: PathBuf::from("job.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(error.to_string(), "Failed to read job.yaml: missing");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_job_error_from_config_error() {
        let job_error: JobError = ConfigError::invalid("page.length", "zero").into();
        match job_error {
            JobError::Config(_) => {}
            _ => panic!("Expected Config variant"),
        }
    }

    #[test]
    fn test_job_error_dump() {
        let error = JobError::Dump("bad magic".to_string());
        assert_eq!(error.to_string(), "Invalid pass dump: bad magic");
    }

    #[test]
    fn test_job_error_from_weave_error() {
        let job_error: JobError = WeaveError::ZeroSeparation.into();
        assert_eq!(
            job_error.to_string(),
            "Weave error: nozzle separation must be non-zero"
        );
    }
}
