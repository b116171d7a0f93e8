use mime::Mime;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::IntakeError;
use crate::models::FileHandle;

/// Default maximum file size: 10 MB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Default allow-list: PDF and common images
pub const DEFAULT_ACCEPTED_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Extension fallback for content `infer` cannot recognise (text formats, SVG)
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("htm", "text/html"),
];

pub type AcceptPredicate = Arc<dyn Fn(&FileHandle) -> bool + Send + Sync>;

/// One token of an `accept` string such as `image/*,.pdf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptPattern {
    /// `*` or `*/*`
    Any,
    /// `image/png`
    Exact(String),
    /// `image/*`, holds the top-level type
    TopLevel(String),
    /// `.pdf`, holds the lowercased extension without the dot
    Extension(String),
}

impl AcceptPattern {
    pub fn parse(token: &str) -> Result<Self, IntakeError> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return Err(IntakeError::InvalidConfig(
                "empty accept pattern".to_string(),
            ));
        }

        if token == "*" || token == "*/*" {
            return Ok(AcceptPattern::Any);
        }

        if let Some(ext) = token.strip_prefix('.') {
            if ext.is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(IntakeError::InvalidConfig(format!(
                    "invalid extension pattern '{}'",
                    token
                )));
            }
            return Ok(AcceptPattern::Extension(ext.to_string()));
        }

        if let Some(top) = token.strip_suffix("/*") {
            if top.is_empty() || top.contains('/') {
                return Err(IntakeError::InvalidConfig(format!(
                    "invalid wildcard pattern '{}'",
                    token
                )));
            }
            return Ok(AcceptPattern::TopLevel(top.to_string()));
        }

        let parsed: Mime = token.parse().map_err(|_| {
            IntakeError::InvalidConfig(format!("invalid media type pattern '{}'", token))
        })?;
        Ok(AcceptPattern::Exact(parsed.essence_str().to_string()))
    }

    pub fn matches(&self, file: &FileHandle) -> bool {
        match self {
            AcceptPattern::Any => true,
            AcceptPattern::Exact(essence) => normalize_media_type(file.media_type()) == *essence,
            AcceptPattern::TopLevel(top) => file
                .media_type()
                .parse::<Mime>()
                .map(|m| m.type_().as_str().eq_ignore_ascii_case(top))
                .unwrap_or(false),
            AcceptPattern::Extension(ext) => file.extension().as_deref() == Some(ext.as_str()),
        }
    }
}

impl fmt::Display for AcceptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptPattern::Any => write!(f, "*/*"),
            AcceptPattern::Exact(essence) => write!(f, "{}", essence),
            AcceptPattern::TopLevel(top) => write!(f, "{}/*", top),
            AcceptPattern::Extension(ext) => write!(f, ".{}", ext),
        }
    }
}

/// Decides which declared media types may enter the staging list
#[derive(Clone)]
pub enum AcceptPolicy {
    Any,
    AllowList(Vec<String>),
    Patterns(Vec<AcceptPattern>),
    Custom(AcceptPredicate),
}

impl fmt::Debug for AcceptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptPolicy::Any => write!(f, "Any"),
            AcceptPolicy::AllowList(types) => f.debug_tuple("AllowList").field(types).finish(),
            AcceptPolicy::Patterns(patterns) => {
                f.debug_tuple("Patterns").field(patterns).finish()
            }
            AcceptPolicy::Custom(_) => write!(f, "Custom(<predicate>)"),
        }
    }
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self::documents_and_images()
    }
}

impl AcceptPolicy {
    /// The fixed PDF and image allow-list
    pub fn documents_and_images() -> Self {
        AcceptPolicy::AllowList(DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect())
    }

    /// Parses an `accept`-attribute style string, e.g. `image/*,.pdf`.
    pub fn parse(accept: &str) -> Result<Self, IntakeError> {
        let patterns = accept
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(AcceptPattern::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if patterns.is_empty() {
            return Err(IntakeError::InvalidConfig(
                "accept string has no patterns".to_string(),
            ));
        }

        if patterns.contains(&AcceptPattern::Any) {
            return Ok(AcceptPolicy::Any);
        }

        Ok(AcceptPolicy::Patterns(patterns))
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&FileHandle) -> bool + Send + Sync + 'static,
    {
        AcceptPolicy::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, file: &FileHandle) -> bool {
        match self {
            AcceptPolicy::Any => true,
            AcceptPolicy::AllowList(types) => {
                let normalized = normalize_media_type(file.media_type());
                types
                    .iter()
                    .any(|allowed| normalize_media_type(allowed) == normalized)
            }
            AcceptPolicy::Patterns(patterns) => patterns.iter().any(|p| p.matches(file)),
            AcceptPolicy::Custom(predicate) => predicate(file),
        }
    }

    /// Short human description used in the drop zone hint
    pub fn describe(&self) -> String {
        match self {
            AcceptPolicy::Any => "Any file type".to_string(),
            AcceptPolicy::AllowList(types) => {
                let all_pdf_or_image = types.iter().all(|t| {
                    let t = normalize_media_type(t);
                    t == "application/pdf" || t.starts_with("image/")
                });
                if all_pdf_or_image {
                    "PDF and images only".to_string()
                } else {
                    format!("Accepted: {}", types.join(", "))
                }
            }
            AcceptPolicy::Patterns(patterns) => {
                let list: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
                format!("Accepted: {}", list.join(", "))
            }
            AcceptPolicy::Custom(_) => "Selected file types only".to_string(),
        }
    }
}

/// Strips parameters and lowercases a media type (`Image/PNG; q=1` -> `image/png`)
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Validates file size against maximum limit
pub fn validate_file_size(file: &FileHandle, max_size: u64) -> Result<(), IntakeError> {
    if file.size() > max_size {
        return Err(IntakeError::TooLarge {
            name: file.name().to_string(),
            size: file.size(),
            max: max_size,
        });
    }
    Ok(())
}

/// Validates the declared media type against the accept policy
pub fn validate_media_type(file: &FileHandle, policy: &AcceptPolicy) -> Result<(), IntakeError> {
    if policy.matches(file) {
        return Ok(());
    }

    Err(IntakeError::InvalidType {
        name: file.name().to_string(),
        media_type: file.media_type().to_string(),
    })
}

/// Type first, then size; a file is reported under one reason only.
pub fn validate_candidate(
    file: &FileHandle,
    policy: &AcceptPolicy,
    max_size: u64,
) -> Result<(), IntakeError> {
    validate_media_type(file, policy)?;
    validate_file_size(file, max_size)
}

/// Detects a media type from magic bytes, then the file extension.
pub fn detect_media_type(header: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(header) {
        return kind.mime_type().to_string();
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    EXTENSION_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| media_type.to_string())
        .unwrap_or_else(|| {
            tracing::debug!("No media type detected for '{}', using octet-stream", filename);
            "application/octet-stream".to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, media_type: &str, size: usize) -> FileHandle {
        FileHandle::from_bytes(name, media_type, vec![0u8; size])
    }

    #[test]
    fn test_validate_file_size() {
        let max = 1024;
        assert!(validate_file_size(&file("a.png", "image/png", 10), max).is_ok());
        assert!(validate_file_size(&file("a.png", "image/png", 1024), max).is_ok());
        assert!(matches!(
            validate_file_size(&file("a.png", "image/png", 1025), max),
            Err(IntakeError::TooLarge { size: 1025, max: 1024, .. })
        ));
    }

    #[test]
    fn test_default_allow_list() {
        let policy = AcceptPolicy::default();
        assert!(policy.matches(&file("a.pdf", "application/pdf", 1)));
        assert!(policy.matches(&file("a.jpg", "image/jpeg", 1)));
        assert!(policy.matches(&file("a.svg", "Image/SVG+XML", 1)));
        assert!(policy.matches(&file("a.png", "image/png; charset=binary", 1)));

        assert!(!policy.matches(&file("a.txt", "text/plain", 1)));
        assert!(!policy.matches(&file("a.bmp", "image/bmp", 1)));
        assert!(!policy.matches(&file("a.exe", "", 1)));
        assert_eq!(policy.describe(), "PDF and images only");
    }

    #[test]
    fn test_parse_accept_string() {
        let policy = AcceptPolicy::parse("image/*, .pdf").unwrap();
        assert!(policy.matches(&file("a.bmp", "image/bmp", 1)));
        assert!(policy.matches(&file("Report.PDF", "application/octet-stream", 1)));
        assert!(!policy.matches(&file("a.txt", "text/plain", 1)));
        assert!(!policy.matches(&file("a.txt", "not a mime", 1)));
        assert_eq!(policy.describe(), "Accepted: image/*, .pdf");

        let exact = AcceptPolicy::parse("text/csv").unwrap();
        assert!(exact.matches(&file("a.csv", "text/csv; charset=utf-8", 1)));
        assert!(!exact.matches(&file("a.txt", "text/plain", 1)));
    }

    #[test]
    fn test_parse_wildcard_accepts_everything() {
        assert!(matches!(AcceptPolicy::parse("*/*").unwrap(), AcceptPolicy::Any));
        assert!(matches!(
            AcceptPolicy::parse("image/png,*").unwrap(),
            AcceptPolicy::Any
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(AcceptPolicy::parse("").is_err());
        assert!(AcceptPolicy::parse(" , ").is_err());
        assert!(AcceptPolicy::parse("image").is_err());
        assert!(AcceptPolicy::parse(".").is_err());
        assert!(AcceptPolicy::parse("a/b/*").is_err());
    }

    #[test]
    fn test_custom_predicate() {
        let policy = AcceptPolicy::custom(|f| f.name().ends_with(".dat"));
        assert!(policy.matches(&file("x.dat", "application/octet-stream", 1)));
        assert!(!policy.matches(&file("x.png", "image/png", 1)));
        assert_eq!(format!("{:?}", policy), "Custom(<predicate>)");
    }

    #[test]
    fn test_type_checked_before_size() {
        let policy = AcceptPolicy::default();
        let err = validate_candidate(&file("big.txt", "text/plain", 2048), &policy, 1024)
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidType { .. }));
    }

    #[test]
    fn test_detect_media_type() {
        assert_eq!(
            detect_media_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "x"),
            "image/png"
        );
        assert_eq!(detect_media_type(b"%PDF-1.5", "x"), "application/pdf");
        assert_eq!(detect_media_type(b"<svg></svg>", "logo.SVG"), "image/svg+xml");
        assert_eq!(detect_media_type(b"hello", "notes.txt"), "text/plain");
        assert_eq!(
            detect_media_type(b"hello", "mystery"),
            "application/octet-stream"
        );
    }
}
