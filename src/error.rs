use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::StagedId;

/// Why a candidate file was kept out of the staging list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidType,
    TooLarge,
    TooManyFiles,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::InvalidType => "INVALID_TYPE",
            RejectReason::TooLarge => "FILE_TOO_LARGE",
            RejectReason::TooManyFiles => "TOO_MANY_FILES",
        }
    }
}

/// A single file that did not make it through admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectReason,
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid file type: {name} ({media_type})")]
    InvalidType { name: String, media_type: String },

    #[error("File too large: {name} is {size} bytes, maximum is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("Too many files: maximum is {max}")]
    TooManyFiles { max: usize },

    #[error("Unknown file: {0}")]
    UnknownFile(StagedId),

    #[error("File is still uploading: {0}")]
    StillUploading(StagedId),

    #[error("Intake is disabled")]
    Disabled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Intake controller is no longer running")]
    ControllerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    /// Maps admission failures onto the user-facing taxonomy.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            IntakeError::InvalidType { .. } => Some(RejectReason::InvalidType),
            IntakeError::TooLarge { .. } => Some(RejectReason::TooLarge),
            IntakeError::TooManyFiles { .. } => Some(RejectReason::TooManyFiles),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_mapping() {
        let err = IntakeError::TooLarge {
            name: "big.png".to_string(),
            size: 11,
            max: 10,
        };
        assert_eq!(err.reject_reason(), Some(RejectReason::TooLarge));
        assert_eq!(
            err.to_string(),
            "File too large: big.png is 11 bytes, maximum is 10 bytes"
        );

        assert_eq!(IntakeError::Disabled.reject_reason(), None);
        assert_eq!(
            IntakeError::TooManyFiles { max: 5 }.reject_reason(),
            Some(RejectReason::TooManyFiles)
        );
    }

    #[test]
    fn test_reject_reason_serializes_snake_case() {
        let json = serde_json::to_string(&RejectReason::TooManyFiles).unwrap();
        assert_eq!(json, "\"too_many_files\"");
        assert_eq!(RejectReason::InvalidType.code(), "INVALID_TYPE");
    }
}
