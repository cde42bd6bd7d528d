use std::path::Path;

use image::{GenericImageView, ImageFormat};
use shared::protocol::{file_extension, is_allowed_file_name};

use crate::error::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewInfo {
    pub width: u32,
    pub height: u32,
}

pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

fn preferred_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

/// File name sent along with the upload. The caller's name is kept only when
/// the service accepts its extension and that extension matches the sniffed
/// format; otherwise the extension is replaced with one derived from the format.
pub fn upload_file_name(requested: Option<&str>, format: ImageFormat) -> String {
    let base = requested
        .map(|name| {
            Path::new(name.trim())
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string()
        })
        .filter(|name| !name.is_empty());

    let Some(name) = base else {
        return format!("image.{}", preferred_extension(format));
    };
    if is_allowed_file_name(&name) && extension_matches(&name, format) {
        return name;
    }

    let stem = match file_extension(&name) {
        Some(_) => Path::new(&name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("image"),
        None => name.as_str(),
    };
    format!("{stem}.{}", preferred_extension(format))
}

fn extension_matches(file_name: &str, format: ImageFormat) -> bool {
    file_extension(file_name)
        .and_then(|ext| ImageFormat::from_extension(ext))
        .is_some_and(|named| named == format)
}

pub fn mime_for_file_name(file_name: &str) -> Option<String> {
    mime_guess::from_path(file_name)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}

pub fn mime_for_format(format: ImageFormat) -> String {
    format.to_mime_type().to_string()
}

/// Checks that a selection actually carries an image before it replaces the
/// current source.
pub fn validate_selection(bytes: &[u8]) -> Result<ImageFormat, ControllerError> {
    if bytes.is_empty() {
        return Err(ControllerError::InvalidInput(
            "selection contained no image data".to_string(),
        ));
    }
    sniff_format(bytes).ok_or_else(|| {
        ControllerError::InvalidInput("selection is not a recognized image format".to_string())
    })
}

pub fn decode_preview(bytes: &[u8]) -> Result<PreviewInfo, String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let (width, height) = decoded.dimensions();
    Ok(PreviewInfo { width, height })
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([shade, shade, shade, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
