use std::env;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::IntakeError;
use crate::utils::validation::{AcceptPolicy, DEFAULT_MAX_FILE_SIZE};

/// Intake configuration
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_step_range"))]
pub struct IntakeConfig {
    /// Maximum number of staged files (default: 5)
    #[validate(range(min = 1, message = "max_files must be at least 1"))]
    pub max_files: usize,

    /// Maximum file size in bytes (default: 10 MB)
    #[validate(range(min = 1, message = "max_file_size must be positive"))]
    pub max_file_size: u64,

    /// Which media types may be staged (default: PDF and images)
    pub accept: AcceptPolicy,

    /// Delay between simulated progress ticks (default: 300 ms)
    pub progress_interval: Duration,

    /// Smallest progress increment per tick (default: 5)
    #[validate(range(min = 1, max = 100, message = "progress step must be within 1..=100"))]
    pub progress_step_min: u8,

    /// Largest progress increment per tick (default: 14)
    #[validate(range(min = 1, max = 100, message = "progress step must be within 1..=100"))]
    pub progress_step_max: u8,

    /// Refuse removal of files that have not reached 100% (default: true)
    pub strict_removal: bool,

    /// Downscale image previews to this edge length; `None` keeps the original bytes
    #[validate(range(min = 16, max = 4096, message = "preview dimension must be within 16..=4096"))]
    pub preview_max_dimension: Option<u32>,

    /// Seed for reproducible progress increments
    pub progress_seed: Option<u64>,
}

fn validate_step_range(config: &IntakeConfig) -> Result<(), ValidationError> {
    if config.progress_step_min > config.progress_step_max {
        let mut err = ValidationError::new("progress_step_range");
        err.message = Some("progress_step_min must not exceed progress_step_max".into());
        return Err(err);
    }
    Ok(())
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            accept: AcceptPolicy::default(),
            progress_interval: Duration::from_millis(300),
            progress_step_min: 5,
            progress_step_max: 14,
            strict_removal: true,
            preview_max_dimension: None,
            progress_seed: None,
        }
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let accept = match env::var("INTAKE_ACCEPT") {
            Ok(value) => AcceptPolicy::parse(&value).unwrap_or_else(|e| {
                tracing::warn!("Ignoring INTAKE_ACCEPT='{}': {}", value, e);
                default.accept.clone()
            }),
            Err(_) => default.accept.clone(),
        };

        Self {
            max_files: env::var("INTAKE_MAX_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_files),

            max_file_size: env::var("INTAKE_MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            accept,

            progress_interval: env::var("INTAKE_PROGRESS_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.progress_interval),

            progress_step_min: env::var("INTAKE_PROGRESS_STEP_MIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.progress_step_min),

            progress_step_max: env::var("INTAKE_PROGRESS_STEP_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.progress_step_max),

            strict_removal: env::var("INTAKE_STRICT_REMOVAL")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.strict_removal),

            preview_max_dimension: env::var("INTAKE_PREVIEW_MAX_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(default.preview_max_dimension),

            progress_seed: default.progress_seed,
        }
    }

    /// Create config for development (fast ticks, removal always allowed)
    pub fn development() -> Self {
        Self {
            progress_interval: Duration::from_millis(50),
            strict_removal: false,
            ..Self::default()
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Size limit in bytes
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Size limit in megabytes, converted to bytes here and nowhere else
    pub fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_file_size = megabytes.saturating_mul(1024 * 1024);
        self
    }

    pub fn with_accept(mut self, accept: AcceptPolicy) -> Self {
        self.accept = accept;
        self
    }

    pub fn with_strict_removal(mut self, strict: bool) -> Self {
        self.strict_removal = strict;
        self
    }

    pub fn with_progress_seed(mut self, seed: u64) -> Self {
        self.progress_seed = Some(seed);
        self
    }

    /// Runs the declarative checks and maps failures to `IntakeError::InvalidConfig`.
    pub fn ensure_valid(&self) -> Result<(), IntakeError> {
        self.validate()
            .map_err(|e| IntakeError::InvalidConfig(e.to_string()))?;
        if self.progress_interval.is_zero() {
            return Err(IntakeError::InvalidConfig(
                "progress_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntakeConfig::default();
        assert_eq!(config.max_files, 5);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.progress_interval, Duration::from_millis(300));
        assert_eq!((config.progress_step_min, config.progress_step_max), (5, 14));
        assert!(config.strict_removal);
        assert!(config.ensure_valid().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = IntakeConfig::development();
        assert!(!config.strict_removal);
        assert_eq!(config.progress_interval, Duration::from_millis(50));
        assert_eq!(config.max_files, 5);
    }

    #[test]
    fn test_max_size_mb_is_converted_to_bytes() {
        let config = IntakeConfig::default().with_max_size_mb(5);
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(IntakeConfig::default().with_max_files(0).ensure_valid().is_err());
        assert!(IntakeConfig::default().with_max_file_size(0).ensure_valid().is_err());

        let mut config = IntakeConfig::default();
        config.progress_step_min = 20;
        config.progress_step_max = 10;
        assert!(config.ensure_valid().is_err());

        let mut config = IntakeConfig::default();
        config.progress_step_min = 0;
        assert!(config.ensure_valid().is_err());

        let mut config = IntakeConfig::default();
        config.progress_interval = Duration::ZERO;
        assert!(config.ensure_valid().is_err());

        let mut config = IntakeConfig::default();
        config.preview_max_dimension = Some(8);
        assert!(config.ensure_valid().is_err());
    }
}
