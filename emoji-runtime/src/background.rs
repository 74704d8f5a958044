//! Background image decoding.

use emoji_core::Size;

use crate::error::{FetchError, FetchResult};

/// Decoded raster ready for display.
#[derive(Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub pixels: Vec<u8>,
    /// Original encoding of the image.
    pub format: ImageFormat,
}

impl BackgroundImage {
    /// Pixel dimensions as a layout size.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

impl std::fmt::Debug for BackgroundImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("format", &self.format)
            .finish()
    }
}

/// Recognized image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF (first frame only).
    Gif,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// Decode raw bytes into a displayable raster.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the bytes are not a supported image.
pub fn decode_image(data: &[u8]) -> FetchResult<BackgroundImage> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data).map_err(|e| FetchError::Decode(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(BackgroundImage {
        width,
        height,
        pixels: rgba.into_raw(),
        format,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 1x1 red PNG.
    pub(crate) const PNG_1X1_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    pub(crate) fn png_1x1() -> Vec<u8> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(PNG_1X1_BASE64)
            .expect("valid base64")
    }

    #[test]
    fn test_format_detection_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(
            ImageFormat::from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"),
            ImageFormat::WebP
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"ab"), ImageFormat::Unknown);
    }

    #[test]
    fn test_decode_png() {
        let image = decode_image(&png_1x1()).expect("decode");
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.pixels.len(), 4);
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.size(), Size::new(1.0, 1.0));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }
}
