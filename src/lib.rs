pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::IntakeConfig;
pub use error::{IntakeError, RejectReason, Rejection};
pub use models::{
    FileHandle, FileSource, Notice, NoticeLevel, StagedFile, StagedId, StagingSnapshot,
};
pub use services::dropzone::{DropZoneState, DropZoneView, EntryView};
pub use services::intake::{FilesAddedCallback, IntakeBuilder, IntakeHandle, SubmitReport};
pub use services::notifier::{ChannelNotifier, Notifier, TracingNotifier};
pub use services::preview::{DataUriPreview, PreviewGenerator};
pub use utils::validation::{AcceptPattern, AcceptPolicy};
