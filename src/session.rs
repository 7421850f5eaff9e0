//! Device session lifecycle: candidate node probing and the streaming state
//! machine.
//!
//! A session owns exactly one opened driver instance and sequences it through
//! `Closed -> Opened -> Initialized -> Streaming` and back. No forward
//! transition skips a state; `close` is reachable from everywhere.

use log::{info, warn};

use crate::traits::{CameraDriver, CameraError, Format, Result};

/// Device node indices probed in order when opening a session.
pub const DEVICE_NODE_CANDIDATES: [u32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No driver held.
    Closed,
    /// Device node opened, format negotiated.
    Opened,
    /// Driver-side buffers prepared.
    Initialized,
    /// Capture running.
    Streaming,
}

/// An opened camera device plus its lifecycle state.
#[derive(Debug)]
pub struct DeviceSession<D: CameraDriver> {
    driver: Option<D>,
    node: u32,
    format: Format,
    state: SessionState,
}

impl<D: CameraDriver> DeviceSession<D> {
    /// Probe `candidates` in order and open the first node that accepts the
    /// requested format.
    ///
    /// Returns `NoDeviceAvailable` when every candidate rejects. Which index
    /// succeeds is up to the kernel; callers must not assume one.
    pub fn open(candidates: &[u32], format: Format) -> Result<Self> {
        for &node in candidates {
            info!(
                "trying node {node} width={} height={}",
                format.width, format.height
            );
            match D::open(node, &format) {
                Ok(driver) => {
                    return Ok(Self {
                        driver: Some(driver),
                        node,
                        format,
                        state: SessionState::Opened,
                    });
                }
                Err(err) => {
                    log::debug!("node {node} rejected: {err}");
                }
            }
        }
        Err(CameraError::NoDeviceAvailable)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Node index that accepted the open.
    #[must_use]
    pub const fn node(&self) -> u32 {
        self.node
    }

    /// Prepare driver-side capture buffers.
    ///
    /// On failure the device stays open; the caller decides whether to close.
    pub fn initialize(&mut self) -> Result<()> {
        let driver = self.require_driver("initialize")?;
        driver
            .initialize()
            .map_err(|err| CameraError::DeviceInit(err.to_string()))?;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Begin capture. Requires a prior successful [`Self::initialize`].
    pub fn start_streaming(&mut self) -> Result<()> {
        if self.state != SessionState::Initialized {
            return Err(CameraError::Stream(
                "start_streaming requires an initialized session".to_owned(),
            ));
        }
        let driver = self.require_driver("start_streaming")?;
        driver.start_streaming()?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Halt capture, returning to the initialized state.
    pub fn stop_streaming(&mut self) -> Result<()> {
        if self.state != SessionState::Streaming {
            return Err(CameraError::Stream(
                "stop_streaming requires a streaming session".to_owned(),
            ));
        }
        let driver = self.require_driver("stop_streaming")?;
        driver.stop_streaming()?;
        self.state = SessionState::Initialized;
        Ok(())
    }

    /// Release driver-side capture buffers, returning to the opened state.
    pub fn uninitialize(&mut self) -> Result<()> {
        let driver = self.require_driver("uninitialize")?;
        driver.uninitialize()?;
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Block until the next raw frame and copy it into `dest`.
    pub fn grab_preview_frame(&mut self, dest: &mut [u8]) -> Result<usize> {
        let driver = self.require_driver("grab_preview_frame")?;
        driver.grab_preview_frame(dest)
    }

    /// Block until the next compressed frame and return it.
    pub fn grab_compressed_frame(&mut self) -> Result<Vec<u8>> {
        let driver = self.require_driver("grab_compressed_frame")?;
        driver.grab_compressed_frame()
    }

    /// Release the device unconditionally. Idempotent.
    pub fn close(&mut self) {
        self.driver = None;
        self.state = SessionState::Closed;
    }

    /// Best-effort teardown: uninitialize, stop streaming, close, in that
    /// fixed order. Failures are logged, never propagated, and never abort
    /// the remaining steps.
    pub fn teardown(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            if let Err(err) = driver.uninitialize() {
                warn!("teardown: uninitialize failed: {err}");
            }
            if let Err(err) = driver.stop_streaming() {
                warn!("teardown: stop_streaming failed: {err}");
            }
        }
        self.close();
    }

    fn require_driver(&mut self, op: &str) -> Result<&mut D> {
        self.driver
            .as_mut()
            .ok_or_else(|| CameraError::Stream(format!("{op} on a closed session")))
    }
}
