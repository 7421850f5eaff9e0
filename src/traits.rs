//! Core traits and types for the camera HAL.
//!
//! Two seams are defined here: [`CameraDriver`], the consumed V4L2 driver
//! boundary, and [`CameraListener`], the exposed host callback boundary.

/// Pixel format representation (e.g., YUYV, MJPG).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed) - the raw preview format.
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format - used for compressed still captures.
    pub const MJPG: Self = Self::new(b"MJPG");
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Capture geometry and pixel format requested from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
}

impl Format {
    /// Create a new format specification.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Self {
            width,
            height,
            fourcc,
        }
    }

    /// Size in bytes of one raw YUYV frame at this geometry (2 bytes/pixel).
    #[must_use]
    pub const fn yuyv_size(&self) -> usize {
        (self.width * self.height * 2) as usize
    }

    /// Size in bytes of one YUV420SP frame at this geometry (1.5 bytes/pixel).
    #[must_use]
    pub const fn yuv420sp_size(&self) -> usize {
        (self.width * self.height * 3 / 2) as usize
    }
}

/// Message types deliverable to the host listener.
///
/// Values match the host framework's callback message constants; the enabled
/// set is kept as a bitmask so several types can be toggled at once.
pub type MsgType = u32;

/// Error event.
pub const MSG_ERROR: MsgType = 0x0001;
/// Shutter fired during still capture.
pub const MSG_SHUTTER: MsgType = 0x0002;
/// Autofocus completion.
pub const MSG_FOCUS: MsgType = 0x0004;
/// Zoom event (unused by this module).
pub const MSG_ZOOM: MsgType = 0x0008;
/// Raw preview frame delivery.
pub const MSG_PREVIEW_FRAME: MsgType = 0x0010;
/// Timestamped video frame delivery while recording.
pub const MSG_VIDEO_FRAME: MsgType = 0x0020;
/// Postview frame (unused by this module).
pub const MSG_POSTVIEW_FRAME: MsgType = 0x0040;
/// Raw still image (unused by this module).
pub const MSG_RAW_IMAGE: MsgType = 0x0080;
/// Compressed still image delivery.
pub const MSG_COMPRESSED_IMAGE: MsgType = 0x0100;
/// All message types.
pub const MSG_ALL_MSGS: MsgType = 0x01FF;

/// Error type for camera operations.
#[derive(Debug)]
pub enum CameraError {
    /// No candidate device node accepted the requested geometry/format.
    NoDeviceAvailable,
    /// Driver-side buffer setup failed.
    DeviceInit(String),
    /// Duplicate start request (preview or recording already active).
    AlreadyRunning,
    /// Unsupported preview or picture format requested.
    InvalidFormat(String),
    /// Unsupported command.
    Rejected,
    /// Error during a streaming operation.
    Stream(String),
    /// I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDeviceAvailable => write!(f, "No device node accepted the request"),
            Self::DeviceInit(msg) => write!(f, "Device initialization failed: {msg}"),
            Self::AlreadyRunning => write!(f, "Already running"),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            Self::Rejected => write!(f, "Command rejected"),
            Self::Stream(msg) => write!(f, "Stream error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over the kernel camera driver.
///
/// One instance corresponds to one opened device node. The lifecycle is
/// sequenced by [`crate::session::DeviceSession`]; implementations only have
/// to honor the individual calls, not enforce ordering. Closing the device is
/// dropping the instance.
pub trait CameraDriver: Sized + Send {
    /// Open the given device node and negotiate the exact requested format.
    ///
    /// Must fail if the node does not exist or the driver cannot deliver the
    /// requested geometry and pixel format as-is.
    fn open(node: u32, format: &Format) -> Result<Self>;

    /// Prepare driver-side capture buffers.
    fn initialize(&mut self) -> Result<()>;

    /// Begin capture.
    fn start_streaming(&mut self) -> Result<()>;

    /// Halt capture.
    fn stop_streaming(&mut self) -> Result<()>;

    /// Release driver-side capture buffers.
    fn uninitialize(&mut self) -> Result<()>;

    /// Block until the next raw frame and copy it into `dest`.
    ///
    /// Returns the number of bytes written.
    fn grab_preview_frame(&mut self, dest: &mut [u8]) -> Result<usize>;

    /// Block until the next compressed (encoded) frame and return it.
    fn grab_compressed_frame(&mut self) -> Result<Vec<u8>>;
}

/// Host-registered callback sink.
///
/// Replaces the classic notify/data/data-timestamp function-pointer trio; the
/// trait object carries whatever context the host needs. All methods are
/// invoked synchronously on HAL worker threads and must not block
/// indefinitely.
pub trait CameraListener: Send + Sync {
    /// Event notification (shutter, focus completion, errors).
    fn notify(&self, msg: MsgType, ext1: i32, ext2: i32);

    /// Frame or image data delivery.
    fn post_data(&self, msg: MsgType, data: &[u8]);

    /// Timestamped frame delivery (video frames while recording).
    fn post_data_timestamp(&self, timestamp_ns: i64, msg: MsgType, data: &[u8]);
}
