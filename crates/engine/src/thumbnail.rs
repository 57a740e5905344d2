//! Thumbnail generation.
//!
//! [`ThumbnailService`] classifies the source with [`FileTypeService`], reads
//! it through the file provider and hands the bytes to an [`ImageCodec`] on
//! the blocking pool. Cancellation is observed before the read, between codec
//! stages and while waiting on the codec; a cancelled request never yields a
//! partial thumbnail.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat};
use model::{File, FsError, ImageType, Result, Thumbnail, ThumbnailFormat};
use resvg::{tiny_skia, usvg};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::filetype::FileTypeService;
use crate::platform::PathStrategy;
use crate::providers::file::run_blocking;
use crate::providers::FileProvider;
use crate::services::PathInput;

/// Default longest edge of a thumbnail, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 256;

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Largest source accepted by [`ImageCrateCodec`]: 24 MiB.
pub const DEFAULT_MAX_SOURCE_SIZE: u64 = 24 * 1024 * 1024;

/// Errors raised by an [`ImageCodec`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// Source exceeds the configured limit.
    #[error("source is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },

    /// Bytes could not be decoded as the detected format.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Resized image could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The cancellation token fired between stages.
    #[error("cancelled")]
    Cancelled,
}

/// What to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailRequest {
    /// Detected format of the source bytes.
    pub image_type: ImageType,
    /// Encoder quality, 1..=100. Ignored for PNG.
    pub quality: u8,
    /// Longest edge of the output.
    pub max_dimension: u32,
    /// Output encoding.
    pub format: ThumbnailFormat,
}

/// Decode, resize and re-encode image bytes.
pub trait ImageCodec: Send + Sync + fmt::Debug {
    /// Produce encoded thumbnail bytes. Implementations should check `cancel`
    /// between stages and return [`CodecError::Cancelled`] when it fires.
    fn render(
        &self,
        request: &ThumbnailRequest,
        source: &[u8],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, CodecError>;
}

/// Codec built on the `image` crate, with `resvg` rasterizing SVG.
#[derive(Debug, Clone)]
pub struct ImageCrateCodec {
    max_source_size: u64,
}

impl Default for ImageCrateCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOURCE_SIZE)
    }
}

impl ImageCrateCodec {
    /// Codec rejecting sources larger than `max_source_size` bytes.
    pub fn new(max_source_size: u64) -> Self {
        Self { max_source_size }
    }

    fn decode(
        &self,
        request: &ThumbnailRequest,
        source: &[u8],
    ) -> std::result::Result<DynamicImage, CodecError> {
        if request.image_type == ImageType::Svg {
            return rasterize_svg(source, request.max_dimension);
        }
        match decoder_format(request.image_type) {
            Some(format) => image::load_from_memory_with_format(source, format),
            None => image::load_from_memory(source),
        }
        .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Decoder for a sniffed type. TGA carries no magic bytes, so guessing
/// never finds it.
fn decoder_format(image_type: ImageType) -> Option<ImageFormat> {
    let format = match image_type {
        ImageType::Png => ImageFormat::Png,
        ImageType::Bmp => ImageFormat::Bmp,
        ImageType::Gif => ImageFormat::Gif,
        ImageType::Tiff => ImageFormat::Tiff,
        ImageType::Jpeg | ImageType::JpegCanon | ImageType::JpegUnknown => ImageFormat::Jpeg,
        ImageType::Ico => ImageFormat::Ico,
        ImageType::Webp => ImageFormat::WebP,
        ImageType::Tga => ImageFormat::Tga,
        ImageType::Avif => ImageFormat::Avif,
        ImageType::None
        | ImageType::Pict
        | ImageType::Psd
        | ImageType::Jpeg2000
        | ImageType::Svg => return None,
    };
    Some(format)
}

impl ImageCodec for ImageCrateCodec {
    fn render(
        &self,
        request: &ThumbnailRequest,
        source: &[u8],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, CodecError> {
        let size = source.len() as u64;
        if size > self.max_source_size {
            return Err(CodecError::TooLarge {
                size,
                max: self.max_source_size,
            });
        }

        let decoded = self.decode(request, source)?;
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }

        let max = request.max_dimension.max(1);
        let resized = if decoded.width() > max || decoded.height() > max {
            decoded.thumbnail(max, max)
        } else {
            decoded
        };
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }

        encode(&resized, request)
    }
}

fn encode(
    image: &DynamicImage,
    request: &ThumbnailRequest,
) -> std::result::Result<Vec<u8>, CodecError> {
    let mut out = Cursor::new(Vec::new());
    let result = match request.format {
        ThumbnailFormat::Jpeg => {
            let quality = request.quality.clamp(1, 100);
            // JPEG has no alpha channel
            image
                .to_rgb8()
                .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        }
        ThumbnailFormat::Png => image.write_with_encoder(PngEncoder::new(&mut out)),
    };
    result.map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Render an SVG so its longest edge is `target` pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn rasterize_svg(source: &[u8], target: u32) -> std::result::Result<DynamicImage, CodecError> {
    let options = usvg::Options::default();
    let tree =
        usvg::Tree::from_data(source, &options).map_err(|e| CodecError::Decode(e.to_string()))?;

    let size = tree.size();
    let longest = size.width().max(size.height());
    if longest <= 0.0 {
        return Err(CodecError::Decode("svg has no extent".to_string()));
    }
    let scale = target.max(1) as f32 / longest;
    let width = ((size.width() * scale).round() as u32).max(1);
    let height = ((size.height() * scale).round() as u32).max(1);

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CodecError::Decode(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    image::RgbaImage::from_raw(width, height, pixmap.take())
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| CodecError::Decode("pixmap size mismatch".to_string()))
}

/// Output settings shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSettings {
    /// Longest edge of the output.
    pub max_dimension: u32,
    /// Output encoding.
    pub format: ThumbnailFormat,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            format: ThumbnailFormat::Jpeg,
        }
    }
}

/// Produces resized previews of image files.
#[derive(Debug, Clone)]
pub struct ThumbnailService {
    file_types: FileTypeService,
    files: FileProvider,
    codec: Arc<dyn ImageCodec>,
    strategy: Arc<dyn PathStrategy>,
    settings: ThumbnailSettings,
}

impl ThumbnailService {
    /// Create a service.
    pub fn new(
        file_types: FileTypeService,
        files: FileProvider,
        codec: Arc<dyn ImageCodec>,
        strategy: Arc<dyn PathStrategy>,
        settings: ThumbnailSettings,
    ) -> Self {
        Self {
            file_types,
            files,
            codec,
            strategy,
            settings,
        }
    }

    /// Thumbnail of the image at `path` at the given JPEG `quality`.
    ///
    /// Fails with `NoThumbnail` when the content is not a recognised image,
    /// and with `Cancelled` if `cancel` fires at any point.
    pub async fn get_thumbnail(
        &self,
        path: impl PathInput,
        quality: u8,
        cancel: &CancellationToken,
    ) -> Result<Thumbnail> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        if !(1..=100).contains(&quality) {
            return Err(FsError::Validation(format!(
                "thumbnail quality must be 1..=100, got {quality}"
            )));
        }

        let image_type = self.file_types.get_image_type(&id, cancel).await?;
        if !image_type.is_image() {
            return Err(FsError::NoThumbnail(id.into_string()));
        }

        let source = self.files.get_file_async(&id, cancel).await?;
        let request = ThumbnailRequest {
            image_type,
            quality,
            max_dimension: self.settings.max_dimension,
            format: self.settings.format,
        };

        let codec = Arc::clone(&self.codec);
        let token = cancel.clone();
        let error_path = id.to_string();
        let bytes = run_blocking(&id, cancel, move || {
            codec
                .render(&request, &source, &token)
                .map_err(|e| match e {
                    CodecError::Cancelled => FsError::Cancelled,
                    other => FsError::ThumbnailEncoding {
                        path: error_path,
                        reason: other.to_string(),
                    },
                })
        })
        .await?;

        // The codec may finish in the same instant the token fires
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        tracing::debug!(
            path = %id,
            %image_type,
            quality,
            bytes = bytes.len(),
            "Generated thumbnail"
        );
        Ok(Thumbnail {
            image_type,
            format: request.format,
            bytes,
        })
    }

    /// Thumbnail of an already hydrated file.
    pub async fn get_thumbnail_of(
        &self,
        file: &File,
        quality: u8,
        cancel: &CancellationToken,
    ) -> Result<Thumbnail> {
        self.get_thumbnail(&file.id, quality, cancel).await
    }
}
