//! Image loading for vision requests.
//!
//! Any readable image is decoded, flattened to RGB and re-encoded as JPEG
//! before it is base64-encoded into the request body.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader};

use crate::error::{ProbeError, ProbeResult};

const JPEG_QUALITY: u8 = 75;

/// Image ready to attach as `inline_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    /// Base64 (standard alphabet) JPEG bytes
    pub data: String,
    pub width: u32,
    pub height: u32,
    /// Color type of the source before conversion (e.g. "Rgba8")
    pub source_color: String,
}

impl EncodedImage {
    /// `WIDTHxHEIGHT` label for reports.
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Normalizes user-provided file paths.
///
/// Handles drag-and-drop shell escaping (`\ `, `\(`, `\)`) and expands `~/`.
#[must_use]
pub fn normalize_input_path(path: &str) -> PathBuf {
    let unescaped = path
        .trim()
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");

    if let Some(rest) = unescaped.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    PathBuf::from(unescaped)
}

/// Reads an image file and encodes it as base64 JPEG.
///
/// # Errors
/// Returns an input error if the file cannot be read, decoded or encoded.
pub fn encode_jpeg(image_path: &Path) -> ProbeResult<EncodedImage> {
    let path_display = image_path.display();
    let data = std::fs::read(image_path)
        .map_err(|e| ProbeError::input(format!("{path_display}: {e}")))?;
    encode_jpeg_bytes(&data).map_err(|e| ProbeError::input(format!("{path_display}: {e}")))
}

/// Encodes in-memory image bytes (any supported format) as base64 JPEG.
///
/// # Errors
/// Returns an error string if decoding or JPEG encoding fails.
pub fn encode_jpeg_bytes(data: &[u8]) -> Result<EncodedImage, String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("decode: {e}"))?;
    let dyn_img = reader.decode().map_err(|e| format!("decode: {e}"))?;

    let source_color = format!("{:?}", dyn_img.color());
    let rgb = dyn_img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| format!("encode: {e}"))?;

    Ok(EncodedImage {
        mime_type: "image/jpeg",
        data: base64::engine::general_purpose::STANDARD.encode(&buf),
        width,
        height,
        source_color,
    })
}
