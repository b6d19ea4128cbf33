//! Request validation performed before any network call

use crate::error::{LensError, Result};
use crate::search::ImageUpload;

/// Minimum trimmed query length
pub const MIN_QUERY_CHARS: usize = 2;

/// Maximum query length
pub const MAX_QUERY_CHARS: usize = 500;

/// Largest accepted upload (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image extensions accepted in URLs and uploads
pub const SUPPORTED_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];

/// Validate a free-text query
pub fn validate_search_query(query: &str) -> Result<()> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(LensError::InvalidQuery(
            "Search query cannot be empty".to_string(),
        ));
    }

    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return Err(LensError::InvalidQuery(format!(
            "Search query must be at least {} characters long",
            MIN_QUERY_CHARS
        )));
    }

    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(LensError::InvalidQuery(format!(
            "Search query cannot exceed {} characters",
            MAX_QUERY_CHARS
        )));
    }

    Ok(())
}

/// Validate an image URL: parseable and pointing at a supported format
pub fn validate_image_url(url: &str) -> Result<()> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(LensError::InvalidQuery(
            "Image URL cannot be empty".to_string(),
        ));
    }

    reqwest::Url::parse(trimmed)
        .map_err(|e| LensError::InvalidQuery(format!("Invalid URL format: {}", e)))?;

    // Extensions may sit before a query string, so match anywhere
    let lowered = trimmed.to_lowercase();
    if !SUPPORTED_EXTENSIONS.iter().any(|ext| lowered.contains(ext)) {
        return Err(LensError::InvalidQuery(format!(
            "Supported formats: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    Ok(())
}

/// Validate an upload's MIME type and size
pub fn validate_image_upload(upload: &ImageUpload) -> Result<()> {
    if !SUPPORTED_MIME_TYPES.contains(&upload.mime_type.as_str()) {
        return Err(LensError::InvalidQuery(
            "Unsupported file type. Please use JPEG, PNG, GIF, BMP, or WebP.".to_string(),
        ));
    }

    if upload.size() > MAX_UPLOAD_BYTES {
        return Err(LensError::InvalidQuery(
            "File size cannot exceed 10MB".to_string(),
        ));
    }

    Ok(())
}

/// MIME type for a supported image filename
pub fn mime_type_for(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.')?.1.to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_bounds() {
        assert!(validate_search_query("").is_err());
        assert!(validate_search_query("   ").is_err());
        assert!(validate_search_query(" a ").is_err());
        assert!(validate_search_query("ab").is_ok());
        assert!(validate_search_query(&"x".repeat(500)).is_ok());
        assert!(validate_search_query(&"x".repeat(501)).is_err());
        // the upper bound counts surrounding whitespace, the lower bound does not
        assert!(validate_search_query(&format!(" {} ", "x".repeat(499))).is_err());
        assert!(validate_search_query("  ab  ").is_ok());
    }

    #[test]
    fn test_image_url() {
        assert!(validate_image_url("https://cdn.example.com/cat.PNG").is_ok());
        assert!(validate_image_url("https://cdn.example.com/cat.jpg?width=200").is_ok());
        assert!(validate_image_url("not a url.png").is_err());
        assert!(validate_image_url("https://cdn.example.com/doc.pdf").is_err());
        assert!(validate_image_url("").is_err());
    }

    #[test]
    fn test_upload() {
        let ok = ImageUpload::new("cat.png", "image/png", vec![0; 16]);
        assert!(validate_image_upload(&ok).is_ok());

        let wrong_type = ImageUpload::new("cat.svg", "image/svg+xml", vec![0; 16]);
        assert!(validate_image_upload(&wrong_type).is_err());

        let too_big = ImageUpload::new("cat.png", "image/png", vec![0; MAX_UPLOAD_BYTES + 1]);
        assert!(validate_image_upload(&too_big).is_err());
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_type_for("photo.JPEG"), Some("image/jpeg"));
        assert_eq!(mime_type_for("photo.webp"), Some("image/webp"));
        assert_eq!(mime_type_for("photo.tiff"), None);
        assert_eq!(mime_type_for("photo"), None);
    }
}
