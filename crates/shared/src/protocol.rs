//! Wire contract with the translation service.

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";
pub const UPLOAD_PATH: &str = "/upload";
pub const UPLOAD_FIELD: &str = "file";
pub const EXPORT_FILE_NAME: &str = "translated-image.png";

/// Extensions the service accepts on the uploaded file name.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed_file_name(file_name: &str) -> bool {
    file_extension(file_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}
