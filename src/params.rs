//! Key/value parameter store consulted before opening a device.
//!
//! Keys and default values mirror the host framework's camera parameter
//! conventions. Only two keys are validated: the preview format must be the
//! single supported raw tag and the picture format must be the single
//! supported compressed tag. Everything else is accepted verbatim.

use std::collections::HashMap;

use crate::traits::{CameraError, Result};

/// Preview size key, value formatted as `WIDTHxHEIGHT`.
pub const KEY_PREVIEW_SIZE: &str = "preview-size";
/// Preview frame rate key, frames per second.
pub const KEY_PREVIEW_FRAME_RATE: &str = "preview-frame-rate";
/// Preview pixel format key.
pub const KEY_PREVIEW_FORMAT: &str = "preview-format";
/// Supported preview sizes advertisement.
pub const KEY_SUPPORTED_PREVIEW_SIZES: &str = "preview-size-values";
/// Supported preview fps ranges advertisement.
pub const KEY_SUPPORTED_PREVIEW_FPS_RANGE: &str = "preview-fps-range-values";
/// Picture size key, value formatted as `WIDTHxHEIGHT`.
pub const KEY_PICTURE_SIZE: &str = "picture-size";
/// Picture format key.
pub const KEY_PICTURE_FORMAT: &str = "picture-format";
/// Supported picture sizes advertisement.
pub const KEY_SUPPORTED_PICTURE_SIZES: &str = "picture-size-values";
/// Video frame format advertisement (format of recorded frames).
pub const KEY_VIDEO_FRAME_FORMAT: &str = "video-frame-format";

/// The only accepted preview format tag.
pub const PREVIEW_FORMAT: &str = "yuv422sp";
/// The only accepted picture format tag.
pub const PICTURE_FORMAT: &str = "jpeg";
/// Format of converted video frames.
pub const VIDEO_FRAME_FORMAT: &str = "yuv420sp";

/// Hand-maintained list of supported (min-fps, max-fps) pairs, in
/// milli-frames per second, exposed verbatim to the host.
pub const SUPPORTED_FPS_RANGES: &str = "(8000,8000),(8000,10000),(10000,10000),\
    (8000,15000),(15000,15000),(8000,20000),(20000,20000),(24000,24000),\
    (25000,25000),(8000,30000),(30000,30000)";

const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;
const DEFAULT_FRAME_RATE: u32 = 30;

/// Validated key/value camera configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    map: HashMap<String, String>,
}

impl Default for Parameters {
    fn default() -> Self {
        let mut p = Self {
            map: HashMap::new(),
        };
        p.set_preview_size(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        p.set(KEY_PREVIEW_FRAME_RATE, &DEFAULT_FRAME_RATE.to_string());
        p.set(KEY_PREVIEW_FORMAT, PREVIEW_FORMAT);
        p.set(KEY_SUPPORTED_PREVIEW_SIZES, "320x240,640x480");
        p.set(KEY_SUPPORTED_PREVIEW_FPS_RANGE, SUPPORTED_FPS_RANGES);
        p.set_picture_size(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        p.set(KEY_PICTURE_FORMAT, PICTURE_FORMAT);
        p.set(KEY_SUPPORTED_PICTURE_SIZES, "320x240");
        p.set(KEY_VIDEO_FRAME_FORMAT, VIDEO_FRAME_FORMAT);
        p
    }
}

impl Parameters {
    /// Get a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Set a raw value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_owned(), value.to_owned());
    }

    /// Preview geometry, falling back to the default when absent or garbled.
    #[must_use]
    pub fn preview_size(&self) -> (u32, u32) {
        self.get(KEY_PREVIEW_SIZE)
            .and_then(parse_size)
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT))
    }

    /// Set the preview geometry.
    pub fn set_preview_size(&mut self, width: u32, height: u32) {
        self.set(KEY_PREVIEW_SIZE, &format!("{width}x{height}"));
    }

    /// Picture geometry, falling back to the default when absent or garbled.
    #[must_use]
    pub fn picture_size(&self) -> (u32, u32) {
        self.get(KEY_PICTURE_SIZE)
            .and_then(parse_size)
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT))
    }

    /// Set the picture geometry.
    pub fn set_picture_size(&mut self, width: u32, height: u32) {
        self.set(KEY_PICTURE_SIZE, &format!("{width}x{height}"));
    }

    /// Preview frame rate in frames per second.
    #[must_use]
    pub fn preview_frame_rate(&self) -> u32 {
        self.get(KEY_PREVIEW_FRAME_RATE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FRAME_RATE)
    }

    /// Check the two format invariants.
    ///
    /// Returns `InvalidFormat` when the preview format is not
    /// [`PREVIEW_FORMAT`] or the picture format is not [`PICTURE_FORMAT`].
    pub fn validate(&self) -> Result<()> {
        if self.get(KEY_PREVIEW_FORMAT) != Some(PREVIEW_FORMAT) {
            return Err(CameraError::InvalidFormat(format!(
                "only {PREVIEW_FORMAT} preview is supported"
            )));
        }
        if self.get(KEY_PICTURE_FORMAT) != Some(PICTURE_FORMAT) {
            return Err(CameraError::InvalidFormat(format!(
                "only {PICTURE_FORMAT} still pictures are supported"
            )));
        }
        Ok(())
    }
}

/// Parse a `WIDTHxHEIGHT` string.
fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}
