use std::sync::Arc;

use crate::error::IntakeError;
use crate::models::{FileHandle, StagedFile, StagedId, StagingSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewUpdate {
    Applied,
    AlreadySet,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Advanced { progress: u8, completed: bool },
    Ignored,
    Missing,
}

/// Ordered, capped list of staged files.
///
/// Every method that changes an entry bumps `version`, so a published
/// snapshot can be compared against the next one without diffing entries.
#[derive(Debug)]
pub struct StagingList {
    entries: Vec<StagedFile>,
    version: u64,
    max_files: usize,
}

impl StagingList {
    pub fn new(max_files: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_files),
            version: 0,
            max_files,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn get(&self, id: StagedId) -> Option<&StagedFile> {
        self.entries.iter().find(|f| f.id == id)
    }

    /// Appends the whole batch or nothing.
    pub fn append(&mut self, files: &[Arc<FileHandle>]) -> Result<Vec<StagedId>, IntakeError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        if self.entries.len() + files.len() > self.max_files {
            return Err(IntakeError::TooManyFiles {
                max: self.max_files,
            });
        }

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let mut staged = StagedFile::new(file.clone());
            while self.get(staged.id).is_some() {
                staged.id = StagedId::new();
            }
            ids.push(staged.id);
            self.entries.push(staged);
        }

        self.version += 1;
        Ok(ids)
    }

    /// Sets the preview once; later writes and writes for removed entries are dropped.
    pub fn set_preview(&mut self, id: StagedId, preview: String) -> PreviewUpdate {
        let Some(entry) = self.entries.iter_mut().find(|f| f.id == id) else {
            return PreviewUpdate::Missing;
        };

        if entry.preview.is_some() {
            return PreviewUpdate::AlreadySet;
        }

        entry.preview = Some(preview);
        self.version += 1;
        PreviewUpdate::Applied
    }

    /// Raises progress to `progress` (clamped to 100). Never lowers it.
    pub fn advance_progress(&mut self, id: StagedId, progress: u8) -> ProgressUpdate {
        let Some(entry) = self.entries.iter_mut().find(|f| f.id == id) else {
            return ProgressUpdate::Missing;
        };

        let progress = progress.min(100);
        if entry.is_complete() || progress <= entry.progress {
            return ProgressUpdate::Ignored;
        }

        entry.progress = progress;
        self.version += 1;
        ProgressUpdate::Advanced {
            progress,
            completed: progress == 100,
        }
    }

    /// Removes an entry. With `strict`, entries below 100% stay put.
    pub fn remove(&mut self, id: StagedId, strict: bool) -> Result<StagedFile, IntakeError> {
        let index = self
            .entries
            .iter()
            .position(|f| f.id == id)
            .ok_or(IntakeError::UnknownFile(id))?;

        if strict && !self.entries[index].is_complete() {
            return Err(IntakeError::StillUploading(id));
        }

        let removed = self.entries.remove(index);
        self.version += 1;
        Ok(removed)
    }

    pub fn snapshot(&self) -> StagingSnapshot {
        StagingSnapshot {
            version: self.version,
            entries: self.entries.clone().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<Arc<FileHandle>> {
        (0..n)
            .map(|i| {
                Arc::new(FileHandle::from_bytes(
                    format!("file-{}.png", i),
                    "image/png",
                    vec![0u8; 4],
                ))
            })
            .collect()
    }

    #[test]
    fn test_append_preserves_order_and_starts_at_zero() {
        let mut list = StagingList::new(5);
        let batch = files(3);
        let ids = list.append(&batch).unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(list.version(), 1);
        let snapshot = list.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|f| f.file().name()).collect();
        assert_eq!(names, vec!["file-0.png", "file-1.png", "file-2.png"]);
        assert!(snapshot.iter().all(|f| f.progress() == 0 && f.preview().is_none()));
        assert!(Arc::ptr_eq(snapshot.entries[0].file(), &batch[0]));
    }

    #[test]
    fn test_append_is_all_or_nothing() {
        let mut list = StagingList::new(2);
        list.append(&files(1)).unwrap();

        let err = list.append(&files(2)).unwrap_err();
        assert!(matches!(err, IntakeError::TooManyFiles { max: 2 }));
        assert_eq!(list.len(), 1);
        assert_eq!(list.version(), 1);

        list.append(&files(1)).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_empty_append_does_not_bump_version() {
        let mut list = StagingList::new(2);
        assert!(list.append(&[]).unwrap().is_empty());
        assert_eq!(list.version(), 0);
    }

    #[test]
    fn test_preview_is_written_once() {
        let mut list = StagingList::new(5);
        let ids = list.append(&files(2)).unwrap();

        assert_eq!(
            list.set_preview(ids[0], "data:first".to_string()),
            PreviewUpdate::Applied
        );
        assert_eq!(
            list.set_preview(ids[0], "data:second".to_string()),
            PreviewUpdate::AlreadySet
        );
        assert_eq!(list.get(ids[0]).unwrap().preview(), Some("data:first"));
        assert_eq!(list.get(ids[1]).unwrap().preview(), None);
        assert_eq!(
            list.set_preview(StagedId::new(), "data:x".to_string()),
            PreviewUpdate::Missing
        );
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut list = StagingList::new(5);
        let ids = list.append(&files(2)).unwrap();
        let id = ids[0];

        assert_eq!(
            list.advance_progress(id, 40),
            ProgressUpdate::Advanced { progress: 40, completed: false }
        );
        assert_eq!(list.advance_progress(id, 30), ProgressUpdate::Ignored);
        assert_eq!(list.get(id).unwrap().progress(), 40);

        assert_eq!(
            list.advance_progress(id, 250),
            ProgressUpdate::Advanced { progress: 100, completed: true }
        );
        let version = list.version();
        assert_eq!(list.advance_progress(id, 100), ProgressUpdate::Ignored);
        assert_eq!(list.version(), version);

        // Isolation
        assert_eq!(list.get(ids[1]).unwrap().progress(), 0);
    }

    #[test]
    fn test_strict_removal_waits_for_completion() {
        let mut list = StagingList::new(5);
        let id = list.append(&files(1)).unwrap()[0];

        assert!(matches!(
            list.remove(id, true),
            Err(IntakeError::StillUploading(_))
        ));
        assert_eq!(list.len(), 1);

        list.advance_progress(id, 100);
        let removed = list.remove(id, true).unwrap();
        assert_eq!(removed.id(), id);
        assert!(list.is_empty());

        assert!(matches!(
            list.remove(id, false),
            Err(IntakeError::UnknownFile(_))
        ));
    }

    #[test]
    fn test_lenient_removal_and_late_writes() {
        let mut list = StagingList::new(5);
        let id = list.append(&files(1)).unwrap()[0];
        list.remove(id, false).unwrap();

        assert_eq!(
            list.set_preview(id, "data:late".to_string()),
            PreviewUpdate::Missing
        );
        assert_eq!(list.advance_progress(id, 50), ProgressUpdate::Missing);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut list = StagingList::new(5);
        let id = list.append(&files(1)).unwrap()[0];
        let before = list.snapshot();
        list.advance_progress(id, 10);

        assert_eq!(before.get(id).unwrap().progress(), 0);
        assert_eq!(list.snapshot().get(id).unwrap().progress(), 10);
        assert!(list.snapshot().version > before.version);
    }
}
