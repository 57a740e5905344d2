//! Image format detection from leading file bytes.
//!
//! Classification ignores the file extension entirely. Signatures are
//! checked most specific first; the weak TGA heuristic runs last.

use std::sync::Arc;

use model::{File, ImageType, Result};
use tokio_util::sync::CancellationToken;

use crate::platform::PathStrategy;
use crate::providers::FileProvider;
use crate::services::PathInput;

/// Bytes read from the start of a file for sniffing.
pub const HEADER_LEN: usize = 256;

/// Headers shorter than this are never classified. A TGA header is 18 bytes.
pub const MIN_HEADER_LEN: usize = 18;

/// Fixed-offset byte signature. `None` matches any byte.
struct Signature {
    offset: usize,
    bytes: &'static [Option<u8>],
    image_type: ImageType,
}

impl Signature {
    fn matches(&self, buf: &[u8]) -> bool {
        let end = self.offset + self.bytes.len();
        buf.len() >= end
            && self
                .bytes
                .iter()
                .zip(&buf[self.offset..end])
                .all(|(want, got)| want.map_or(true, |b| b == *got))
    }
}

macro_rules! sig {
    (@byte _) => { None };
    (@byte $b:literal) => { Some($b) };
    ($offset:expr, [$($b:tt)*] => $ty:expr) => {
        Signature {
            offset: $offset,
            bytes: &[$(sig!(@byte $b)),*],
            image_type: $ty,
        }
    };
}

const SIGNATURES: &[Signature] = &[
    sig!(0, [0x89 0x50 0x4E 0x47] => ImageType::Png),
    sig!(0, [0xFF 0xD8 0xFF 0xE0] => ImageType::Jpeg),
    sig!(0, [0xFF 0xD8 0xFF 0xE1] => ImageType::JpegCanon),
    sig!(0, [0xFF 0xD8 0xFF 0xE2] => ImageType::JpegUnknown),
    sig!(0, [0xFF 0x4F 0xFF 0x51] => ImageType::Jpeg2000),
    // JP2 signature box
    sig!(0, [0x00 0x00 0x00 0x0C 0x6A 0x50 0x20 0x20 0x0D 0x0A 0x87 0x0A] => ImageType::Jpeg2000),
    sig!(0, [0x52 0x49 0x46 0x46 _ _ _ _ 0x57 0x45 0x42 0x50] => ImageType::Webp),
    sig!(0, [0x38 0x42 0x50 0x53] => ImageType::Psd),
    sig!(0, [0x00 0x00 0x01 0x00] => ImageType::Ico),
    sig!(0, [0x00 0x11 0x02 0xFF] => ImageType::Pict),
    sig!(0, [0x49 0x49 0x2A] => ImageType::Tiff),
    sig!(0, [0x4D 0x4D 0x2A] => ImageType::Tiff),
    sig!(0, [0x47 0x49 0x46] => ImageType::Gif),
    sig!(0, [0x42 0x4D] => ImageType::Bmp),
];

/// ISO base media `ftyp` brands, checked at bytes 8..12.
const FTYP_BRANDS: &[(&[u8; 4], ImageType)] = &[
    (b"avif", ImageType::Avif),
    (b"avis", ImageType::Avif),
    (b"jp2 ", ImageType::Jpeg2000),
    (b"jpx ", ImageType::Jpeg2000),
    (b"jpm ", ImageType::Jpeg2000),
    (b"mjp2", ImageType::Jpeg2000),
];

/// Classify a file header.
pub fn sniff(header: &[u8]) -> ImageType {
    if header.len() < MIN_HEADER_LEN {
        return ImageType::None;
    }

    if let Some(ty) = sniff_ftyp(header) {
        return ty;
    }
    if let Some(sig) = SIGNATURES.iter().find(|s| s.matches(header)) {
        return sig.image_type;
    }
    if is_svg(header) {
        return ImageType::Svg;
    }
    if is_tga(header) {
        return ImageType::Tga;
    }
    ImageType::None
}

fn sniff_ftyp(header: &[u8]) -> Option<ImageType> {
    if header.get(4..8)? != b"ftyp" {
        return None;
    }
    let brand = header.get(8..12)?;
    FTYP_BRANDS
        .iter()
        .find(|(b, _)| b.as_slice() == brand)
        .map(|(_, ty)| *ty)
}

/// SVG text, optionally behind a BOM, whitespace or an XML declaration.
fn is_svg(header: &[u8]) -> bool {
    let text = String::from_utf8_lossy(header);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") {
        return true;
    }
    text.starts_with("<?xml") && text.contains("<svg")
}

/// Uncompressed true-colour TGA: colour map type 0 or 1, image type 2.
fn is_tga(header: &[u8]) -> bool {
    matches!(header[1], 0 | 1) && header[2] == 2
}

/// Async image classification gated on read permission.
#[derive(Debug, Clone)]
pub struct FileTypeService {
    files: FileProvider,
    strategy: Arc<dyn PathStrategy>,
}

impl FileTypeService {
    /// Create a service reading headers through `files`.
    pub fn new(files: FileProvider, strategy: Arc<dyn PathStrategy>) -> Self {
        Self { files, strategy }
    }

    /// Image type of the file at `path`.
    ///
    /// Requires `ReadContents`. Files shorter than [`MIN_HEADER_LEN`] and
    /// unrecognised content yield [`ImageType::None`].
    pub async fn get_image_type(
        &self,
        path: impl PathInput,
        cancel: &CancellationToken,
    ) -> Result<ImageType> {
        let id = path.to_file_id(self.strategy.as_ref())?;
        let header = self.files.read_header_async(&id, HEADER_LEN, cancel).await?;
        let image_type = sniff(&header);
        tracing::debug!(path = %id, %image_type, header_len = header.len(), "Sniffed file type");
        Ok(image_type)
    }

    /// Image type of an already hydrated file.
    pub async fn get_image_type_of(
        &self,
        file: &File,
        cancel: &CancellationToken,
    ) -> Result<ImageType> {
        self.get_image_type(&file.id, cancel).await
    }
}
