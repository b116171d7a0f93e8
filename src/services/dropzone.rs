use serde::Serialize;

use crate::config::IntakeConfig;
use crate::models::{StagedFile, StagedId, StagingSnapshot};
use crate::utils::format::{format_limit, format_size_mb, kind_label};

/// Visual state of the drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropZoneState {
    #[default]
    Idle,
    DragActive,
}

/// Drop target and file picker input surface
#[derive(Debug, Clone, Default)]
pub struct DropZone {
    state: DropZoneState,
    disabled: bool,
}

impl DropZone {
    pub fn new(disabled: bool) -> Self {
        Self {
            state: DropZoneState::Idle,
            disabled,
        }
    }

    pub fn state(&self) -> DropZoneState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.state = DropZoneState::Idle;
        }
    }

    /// Drag enter/over. Returns whether the state changed.
    pub fn drag_enter(&mut self) -> bool {
        if self.disabled || self.state == DropZoneState::DragActive {
            return false;
        }
        self.state = DropZoneState::DragActive;
        true
    }

    pub fn drag_leave(&mut self) -> bool {
        let changed = self.state != DropZoneState::Idle;
        self.state = DropZoneState::Idle;
        changed
    }

    /// A drop always ends the drag; the files pass through unless disabled.
    pub fn drop_files<T>(&mut self, files: Vec<T>) -> Option<Vec<T>> {
        self.state = DropZoneState::Idle;
        self.pick_files(files)
    }

    pub fn pick_files<T>(&self, files: Vec<T>) -> Option<Vec<T>> {
        if self.disabled { None } else { Some(files) }
    }

    pub fn view(&self, snapshot: &StagingSnapshot, config: &IntakeConfig) -> DropZoneView {
        let entries = snapshot
            .iter()
            .map(|f| EntryView::new(f, self.disabled, config.strict_removal))
            .collect();

        DropZoneView {
            state: self.state,
            disabled: self.disabled,
            hint: format!(
                "{}, max {} files, up to {} each",
                config.accept.describe(),
                config.max_files,
                format_limit(config.max_file_size)
            ),
            counter: format!("Uploaded Files ({}/{})", snapshot.len(), config.max_files),
            version: snapshot.version,
            entries,
        }
    }
}

/// Render model for the whole intake surface
#[derive(Debug, Clone, Serialize)]
pub struct DropZoneView {
    pub state: DropZoneState,
    pub disabled: bool,
    pub hint: String,
    pub counter: String,
    pub version: u64,
    pub entries: Vec<EntryView>,
}

/// Render model for one staged file
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub id: StagedId,
    pub name: String,
    pub size_label: String,
    pub kind_label: &'static str,
    pub status_label: &'static str,
    pub progress: u8,
    pub preview: Option<String>,
    pub removable: bool,
}

impl EntryView {
    fn new(file: &StagedFile, disabled: bool, strict_removal: bool) -> Self {
        Self {
            id: file.id(),
            name: file.file().name().to_string(),
            size_label: format_size_mb(file.file().size()),
            kind_label: kind_label(file.file()),
            status_label: if file.is_complete() { "Complete" } else { "Uploading..." },
            progress: file.progress(),
            preview: file.preview().map(str::to_string),
            removable: !disabled && (!strict_removal || file.is_complete()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileHandle;
    use crate::services::staging::StagingList;
    use std::sync::Arc;

    #[test]
    fn test_drag_state_transitions() {
        let mut zone = DropZone::default();
        assert_eq!(zone.state(), DropZoneState::Idle);

        assert!(zone.drag_enter());
        assert!(!zone.drag_enter());
        assert_eq!(zone.state(), DropZoneState::DragActive);

        assert!(zone.drag_leave());
        assert!(!zone.drag_leave());
        assert_eq!(zone.state(), DropZoneState::Idle);

        zone.drag_enter();
        assert_eq!(zone.drop_files(vec![1, 2]), Some(vec![1, 2]));
        assert_eq!(zone.state(), DropZoneState::Idle);
    }

    #[test]
    fn test_disabled_zone_swallows_input() {
        let mut zone = DropZone::new(true);
        assert!(!zone.drag_enter());
        assert_eq!(zone.state(), DropZoneState::Idle);
        assert_eq!(zone.drop_files(vec![1]), None);
        assert_eq!(zone.pick_files(vec![1]), None);

        zone.set_disabled(false);
        assert_eq!(zone.pick_files(vec![1]), Some(vec![1]));

        zone.drag_enter();
        zone.set_disabled(true);
        assert_eq!(zone.state(), DropZoneState::Idle);
    }

    #[test]
    fn test_view_labels() {
        let config = IntakeConfig::default();
        let mut list = StagingList::new(config.max_files);
        let ids = list
            .append(&[
                Arc::new(FileHandle::from_bytes("a.png", "image/png", vec![0u8; 1024 * 1024])),
                Arc::new(FileHandle::from_bytes("b.pdf", "application/pdf", vec![0u8; 10])),
            ])
            .unwrap();
        list.advance_progress(ids[1], 100);

        let view = DropZone::default().view(&list.snapshot(), &config);
        assert_eq!(view.hint, "PDF and images only, max 5 files, up to 10MB each");
        assert_eq!(view.counter, "Uploaded Files (2/5)");
        assert_eq!(view.entries.len(), 2);

        let png = &view.entries[0];
        assert_eq!(png.size_label, "1.00MB");
        assert_eq!(png.kind_label, "Image");
        assert_eq!(png.status_label, "Uploading...");
        assert!(!png.removable);

        let pdf = &view.entries[1];
        assert_eq!(pdf.kind_label, "PDF");
        assert_eq!(pdf.status_label, "Complete");
        assert!(pdf.removable);

        let disabled = DropZone::new(true).view(&list.snapshot(), &config);
        assert!(!disabled.entries[1].removable);
    }
}
