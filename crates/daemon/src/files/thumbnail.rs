//! Preview images for listed media files.
//!
//! Images are decoded with the `image` crate. Videos go through an external
//! `ffmpeg` binary that writes the first frame as PNG to stdout. Any failure
//! yields no thumbnail; a listing never fails because of a preview.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::config::{ThumbnailConfig, DEFAULT_THUMBNAIL_DIMENSION};

/// File extensions (lower-case, without dot) decoded as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// File extensions (lower-case, without dot) handled as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Errors that can occur while building a thumbnail.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// ffmpeg was not configured and is not on PATH.
    #[error("ffmpeg is not available")]
    FfmpegUnavailable,

    /// ffmpeg ran but produced no frame.
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Media category derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a path by its lower-cased extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// An encoded preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// MIME type of `data`.
    pub mime: &'static str,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

impl Thumbnail {
    /// Wrap PNG-encoded bytes.
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime: "image/png",
            data,
        }
    }

    /// Base64 encoding of the image bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// `data:` URI suitable for an `<img src>` attribute.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }
}

/// Builds thumbnails for image and video files.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    /// Neither edge of the output exceeds this.
    max_dimension: u32,
    /// ffmpeg binary used for videos.
    ffmpeg: Option<PathBuf>,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_DIMENSION)
    }
}

impl ThumbnailGenerator {
    /// Create a generator, looking for `ffmpeg` on PATH.
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            ffmpeg: which::which("ffmpeg").ok(),
        }
    }

    /// Create a generator from the thumbnail configuration section.
    pub fn from_config(config: &ThumbnailConfig) -> Self {
        let generator = Self::new(config.max_dimension);
        match &config.ffmpeg_path {
            Some(path) => generator.with_ffmpeg(Some(path.clone())),
            None => generator,
        }
    }

    /// Override the ffmpeg binary. `None` disables video thumbnails.
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    /// Maximum edge length of generated thumbnails.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Build a thumbnail for `path`, or `None` for unsupported or broken files.
    pub fn generate(&self, path: &Path) -> Option<Thumbnail> {
        let result = match MediaKind::from_path(path)? {
            MediaKind::Image => self.image_thumbnail(path),
            MediaKind::Video => self.video_thumbnail(path),
        };

        match result {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                debug!("No thumbnail for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Decode an image file and shrink it.
    pub fn image_thumbnail(&self, path: &Path) -> Result<Thumbnail, ThumbnailError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        self.encode(image)
    }

    /// Extract the first frame of a video with ffmpeg and shrink it.
    pub fn video_thumbnail(&self, path: &Path) -> Result<Thumbnail, ThumbnailError> {
        let ffmpeg = self
            .ffmpeg
            .as_ref()
            .ok_or(ThumbnailError::FfmpegUnavailable)?;

        let output = Command::new(ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() || output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ThumbnailError::Ffmpeg(if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            }));
        }

        let frame = image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)?;
        self.encode(frame)
    }

    /// Downscale (never upscale) to fit the bounding box and encode as PNG.
    fn encode(&self, image: DynamicImage) -> Result<Thumbnail, ThumbnailError> {
        let max = self.max_dimension;
        let image = if image.width() > max || image.height() > max {
            image.thumbnail(max, max)
        } else {
            image
        };

        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(Thumbnail::png(buffer))
    }
}
