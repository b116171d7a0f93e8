use crate::models::FileHandle;
use crate::utils::validation::normalize_media_type;

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Size in megabytes with two decimals, e.g. `1.50MB`
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / MB as f64)
}

/// Compact limit label for hints and notices: `10MB`, `512KB`, `1500 bytes`
pub fn format_limit(bytes: u64) -> String {
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn kind_label(file: &FileHandle) -> &'static str {
    if file.is_image() {
        "Image"
    } else if normalize_media_type(file.media_type()) == "application/pdf" {
        "PDF"
    } else {
        "File"
    }
}

/// `a.png` / `a.png, b.png`
pub fn join_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_mb() {
        assert_eq!(format_size_mb(0), "0.00MB");
        assert_eq!(format_size_mb(MB + MB / 2), "1.50MB");
        assert_eq!(format_size_mb(6 * MB), "6.00MB");
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(10 * MB), "10MB");
        assert_eq!(format_limit(512 * KB), "512KB");
        assert_eq!(format_limit(1500), "1500 bytes");
    }

    #[test]
    fn test_kind_label() {
        let png = FileHandle::from_bytes("a.png", "image/png", vec![0u8]);
        let pdf = FileHandle::from_bytes("a.pdf", "application/pdf", vec![0u8]);
        let txt = FileHandle::from_bytes("a.txt", "text/plain", vec![0u8]);
        assert_eq!(kind_label(&png), "Image");
        assert_eq!(kind_label(&pdf), "PDF");
        assert_eq!(kind_label(&txt), "File");
    }
}
