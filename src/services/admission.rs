use std::sync::Arc;

use crate::config::IntakeConfig;
use crate::error::{RejectReason, Rejection};
use crate::models::{FileHandle, Notice};
use crate::utils::format::{format_limit, join_names};
use crate::utils::validation::validate_candidate;

/// Result of running one candidate batch through admission
#[derive(Debug, Default)]
pub struct AdmissionOutcome {
    pub accepted: Vec<Arc<FileHandle>>,
    pub rejections: Vec<Rejection>,
}

impl AdmissionOutcome {
    /// True when the count limit turned the whole batch away
    pub fn batch_rejected(&self) -> bool {
        self.rejections
            .iter()
            .any(|r| r.reason == RejectReason::TooManyFiles)
    }

    fn names_for(&self, reason: RejectReason) -> Vec<&str> {
        self.rejections
            .iter()
            .filter(|r| r.reason == reason)
            .map(|r| r.file_name.as_str())
            .collect()
    }

    /// One notice per rejection reason, naming the offending files.
    pub fn notices(&self, config: &IntakeConfig) -> Vec<Notice> {
        let mut notices = Vec::new();

        let invalid = self.names_for(RejectReason::InvalidType);
        if !invalid.is_empty() {
            let verb = if invalid.len() == 1 { "is" } else { "are" };
            notices.push(Notice::rejected(
                RejectReason::InvalidType,
                "Invalid file type",
                format!(
                    "{} {} not an accepted file type ({}).",
                    join_names(invalid),
                    verb,
                    config.accept.describe()
                ),
            ));
        }

        let too_large = self.names_for(RejectReason::TooLarge);
        if !too_large.is_empty() {
            let verb = if too_large.len() == 1 { "exceeds" } else { "exceed" };
            notices.push(Notice::rejected(
                RejectReason::TooLarge,
                "File too large",
                format!(
                    "{} {} the maximum size of {}.",
                    join_names(too_large),
                    verb,
                    format_limit(config.max_file_size)
                ),
            ));
        }

        if self.batch_rejected() {
            notices.push(Notice::rejected(
                RejectReason::TooManyFiles,
                "Too many files",
                format!(
                    "You can only upload a maximum of {} files.",
                    config.max_files
                ),
            ));
        }

        notices
    }
}

/// Partitions a batch into accepted and rejected files.
///
/// Type and size are checked per file. The count limit applies to the
/// batch as a whole: if the survivors would push the staging list past
/// `max_files`, none of them are accepted.
pub fn evaluate(
    batch: &[Arc<FileHandle>],
    staged_count: usize,
    config: &IntakeConfig,
) -> AdmissionOutcome {
    let mut outcome = AdmissionOutcome::default();

    for file in batch {
        match validate_candidate(file, &config.accept, config.max_file_size) {
            Ok(()) => outcome.accepted.push(file.clone()),
            Err(e) => {
                let reason = e
                    .reject_reason()
                    .unwrap_or(RejectReason::InvalidType);
                tracing::warn!("Rejected {}: {}", file.name(), e);
                outcome.rejections.push(Rejection {
                    file_name: file.name().to_string(),
                    reason,
                });
            }
        }
    }

    if staged_count + outcome.accepted.len() > config.max_files {
        tracing::warn!(
            "Batch of {} would exceed the limit of {} files ({} already staged)",
            outcome.accepted.len(),
            config.max_files,
            staged_count
        );
        for file in outcome.accepted.drain(..) {
            outcome.rejections.push(Rejection {
                file_name: file.name().to_string(),
                reason: RejectReason::TooManyFiles,
            });
        }
    }

    outcome
}
