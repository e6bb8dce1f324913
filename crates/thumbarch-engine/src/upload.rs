use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, ImageReader};

use crate::error::StudioError;

/// Intake limit for subject photos.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Image payload as sent to the gateway: MIME type plus base64 body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

/// A validated subject photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    file_name: Option<String>,
    mime_type: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl UploadedImage {
    pub fn from_path(path: &Path) -> Result<Self, StudioError> {
        let metadata = fs::metadata(path).map_err(|err| {
            StudioError::upload(format!("cannot read {}: {err}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(StudioError::upload(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() as usize > MAX_UPLOAD_BYTES {
            return Err(StudioError::upload(format!(
                "{} is {} bytes; the limit is {} bytes",
                path.display(),
                metadata.len(),
                MAX_UPLOAD_BYTES
            )));
        }
        let bytes = fs::read(path).map_err(|err| {
            StudioError::upload(format!("cannot read {}: {err}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        Self::from_bytes(bytes, file_name)
    }

    /// Accepts `data:<mime>;base64,<payload>`. The declared MIME type is
    /// ignored in favor of the sniffed one.
    pub fn from_data_url(data_url: &str) -> Result<Self, StudioError> {
        let rest = data_url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::upload("not a data: URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::upload("data: URL has no payload"))?;
        if !header.ends_with(";base64") {
            return Err(StudioError::upload("data: URL is not base64 encoded"));
        }
        let bytes = BASE64
            .decode(payload.trim().as_bytes())
            .map_err(|err| StudioError::upload(format!("data: URL payload: {err}")))?;
        Self::from_bytes(bytes, None)
    }

    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<String>) -> Result<Self, StudioError> {
        if bytes.is_empty() {
            return Err(StudioError::upload("image is empty"));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StudioError::upload(format!(
                "image is {} bytes; the limit is {} bytes",
                bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }
        let format = image::guess_format(&bytes)
            .map_err(|_| StudioError::upload("unrecognized image format"))?;
        let mime_type = mime_for_format(format).ok_or_else(|| {
            StudioError::upload(format!("unsupported image format {format:?}"))
        })?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|err| StudioError::upload(format!("cannot decode image: {err}")))?;
        if width == 0 || height == 0 {
            return Err(StudioError::upload("image has zero size"));
        }
        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
            width,
            height,
        })
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Height over width.
    pub fn aspect(&self) -> f64 {
        self.height as f64 / self.width as f64
    }

    pub fn inline(&self) -> InlineImage {
        InlineImage {
            mime_type: self.mime_type.clone(),
            data_base64: BASE64.encode(&self.bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}
