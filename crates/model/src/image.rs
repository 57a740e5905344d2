//! Image classification and thumbnail values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Image format detected from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    /// Not a recognised image.
    None,
    Png,
    Bmp,
    Gif,
    /// TIFF in either byte order.
    Tiff,
    /// JFIF JPEG (`FF D8 FF E0`).
    Jpeg,
    /// EXIF JPEG as written by most cameras (`FF D8 FF E1`).
    JpegCanon,
    /// JPEG with an ICC profile marker (`FF D8 FF E2`).
    JpegUnknown,
    Pict,
    Ico,
    Psd,
    Jpeg2000,
    Avif,
    Webp,
    Tga,
    Svg,
}

impl ImageType {
    /// Whether this is a recognised image format.
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether this is one of the JPEG variants.
    pub fn is_jpeg(&self) -> bool {
        matches!(self, Self::Jpeg | Self::JpegCanon | Self::JpegUnknown)
    }

    /// MIME type for the format, if it has a registered one.
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Png => Some("image/png"),
            Self::Bmp => Some("image/bmp"),
            Self::Gif => Some("image/gif"),
            Self::Tiff => Some("image/tiff"),
            Self::Jpeg | Self::JpegCanon | Self::JpegUnknown => Some("image/jpeg"),
            Self::Pict => Some("image/x-pict"),
            Self::Ico => Some("image/x-icon"),
            Self::Psd => Some("image/vnd.adobe.photoshop"),
            Self::Jpeg2000 => Some("image/jp2"),
            Self::Avif => Some("image/avif"),
            Self::Webp => Some("image/webp"),
            Self::Tga => Some("image/x-tga"),
            Self::Svg => Some("image/svg+xml"),
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Jpeg => "jpeg",
            Self::JpegCanon => "jpeg (exif)",
            Self::JpegUnknown => "jpeg (icc)",
            Self::Pict => "pict",
            Self::Ico => "ico",
            Self::Psd => "psd",
            Self::Jpeg2000 => "jpeg2000",
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Tga => "tga",
            Self::Svg => "svg",
        };
        f.write_str(s)
    }
}

/// Encoding used for generated thumbnail bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    /// Lossy, honours the requested quality.
    #[default]
    Jpeg,
    /// Lossless, quality is ignored.
    Png,
}

impl ThumbnailFormat {
    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A resized preview of an image file. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Format of the source image.
    pub image_type: ImageType,
    /// Encoding of `bytes`.
    pub format: ThumbnailFormat,
    /// Encoded preview bytes.
    pub bytes: Vec<u8>,
}
