//! Camera HAL bridging a host camera framework to a V4L2 kernel driver.
//!
//! The module opens a device node, negotiates a pixel format, streams raw
//! frames through a background acquisition loop, converts them for the video
//! path, and forwards lifecycle calls (preview, recording, still capture,
//! autofocus) to host-registered callbacks. The driver boundary is a trait,
//! enabling production use with real hardware and testing with mock devices.

pub mod convert;
pub mod device;
pub mod factory;
pub mod hal;
pub mod params;
pub mod session;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use device::V4l2Driver;
pub use factory::{camera_info, number_of_cameras, CameraFactory, CameraInfo, Facing};
pub use hal::CameraHardware;
pub use params::Parameters;
pub use session::{DeviceSession, SessionState, DEVICE_NODE_CANDIDATES};
pub use traits::{
    CameraDriver, CameraError, CameraListener, Format, FourCC, MsgType, Result,
};
