use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::error::{IntakeError, RejectReason};
use crate::utils::validation;

/// Bytes read from the front of a file on disk to sniff its media type
const SNIFF_LEN: u64 = 8192;

/// Where a file's contents live. The intake never copies them.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Bytes),
    Path(PathBuf),
}

/// A raw file handed to the intake: name, declared media type, size and contents
#[derive(Debug, Clone, Serialize)]
pub struct FileHandle {
    name: String,
    media_type: String,
    size: u64,
    #[serde(skip)]
    source: FileSource,
}

impl FileHandle {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        size: u64,
        source: FileSource,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
            source,
        }
    }

    /// In-memory file; the size is the length of `data`.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::new(name, media_type, size, FileSource::Memory(data))
    }

    /// Stats a file on disk and sniffs its media type from the first bytes,
    /// falling back to the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(IntakeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let mut header = Vec::with_capacity(SNIFF_LEN as usize);
        file.take(SNIFF_LEN).read_to_end(&mut header).await?;

        let media_type = validation::detect_media_type(&header, &name);
        Ok(Self::new(
            name,
            media_type,
            metadata.len(),
            FileSource::Path(path.to_path_buf()),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Lowercased extension of the file name, without the dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn is_image(&self) -> bool {
        validation::normalize_media_type(&self.media_type).starts_with("image/")
    }

    /// Reads the whole payload.
    pub async fn read_all(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(data) => Ok(data.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// Correlation key for a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagedId(Uuid);

impl StagedId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StagedId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StagedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file admitted into the staging list along with its display state
#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub(crate) id: StagedId,
    pub(crate) file: Arc<FileHandle>,
    pub(crate) preview: Option<String>,
    pub(crate) progress: u8,
}

impl StagedFile {
    pub(crate) fn new(file: Arc<FileHandle>) -> Self {
        Self {
            id: StagedId::new(),
            file,
            preview: None,
            progress: 0,
        }
    }

    pub fn id(&self) -> StagedId {
        self.id
    }

    pub fn file(&self) -> &Arc<FileHandle> {
        &self.file
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }

    pub fn is_image(&self) -> bool {
        self.file.is_image()
    }
}

/// Immutable view of the staging list, published after every mutation
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingSnapshot {
    pub version: u64,
    pub entries: Arc<[StagedFile]>,
}

impl StagingSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: StagedId) -> Option<&StagedFile> {
        self.entries.iter().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedFile> {
        self.entries.iter()
    }

    pub fn all_complete(&self) -> bool {
        self.entries.iter().all(StagedFile::is_complete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A user-facing diagnostic, the analogue of a toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub reason: Option<RejectReason>,
}

impl Notice {
    pub fn rejected(reason: RejectReason, title: &str, description: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.to_string(),
            description,
            reason: Some(reason),
        }
    }

    pub fn upload_complete(file_name: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Upload complete".to_string(),
            description: format!("{} has been successfully uploaded.", file_name),
            reason: None,
        }
    }
}
