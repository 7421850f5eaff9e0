//! Mock driver and listener implementations for testing without hardware.
//!
//! The driver boundary opens devices through an associated function, so the
//! mock is scripted per test thread: [`script`] resets the thread-local
//! script, applies the test's adjustments, and hands back a [`MockLog`] that
//! records driver lifecycle calls across threads.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::traits::{
    CameraDriver, CameraError, CameraListener, Format, MsgType, Result,
};

/// Per-test configuration for [`MockDriver`].
#[derive(Debug, Clone)]
pub struct MockScript {
    /// The single node index that accepts an open; `None` rejects all.
    pub accepted_node: Option<u32>,
    /// Make `initialize` fail.
    pub fail_initialize: bool,
    /// Make `stop_streaming` fail (teardown must still complete).
    pub fail_stop_streaming: bool,
    /// Byte used to fill grabbed preview frames.
    pub frame_fill: u8,
    /// Bytes returned for compressed grabs.
    pub compressed_frame: Vec<u8>,
    /// Simulated per-frame capture time.
    pub grab_delay: Duration,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            accepted_node: Some(0),
            fail_initialize: false,
            fail_stop_streaming: false,
            frame_fill: 0x42,
            compressed_frame: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00, 0xFF, 0xD9],
            grab_delay: Duration::from_millis(1),
        }
    }
}

/// Shared record of driver lifecycle calls, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct MockLog(Arc<Mutex<Vec<String>>>);

impl MockLog {
    fn push(&self, event: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.into());
    }

    /// Snapshot of recorded events in order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Default)]
struct ScriptState {
    script: MockScript,
    log: MockLog,
}

thread_local! {
    static SCRIPT: RefCell<ScriptState> = RefCell::new(ScriptState::default());
}

/// Reset the calling thread's mock script, apply `adjust`, and return the
/// event log that subsequently opened drivers will write to.
pub fn script(adjust: impl FnOnce(&mut MockScript)) -> MockLog {
    SCRIPT.with(|state| {
        let mut state = state.borrow_mut();
        *state = ScriptState::default();
        adjust(&mut state.script);
        state.log.clone()
    })
}

/// Scriptable in-memory camera driver.
#[derive(Debug)]
pub struct MockDriver {
    format: Format,
    fill: u8,
    compressed: Vec<u8>,
    fail_initialize: bool,
    fail_stop_streaming: bool,
    grab_delay: Duration,
    frames_grabbed: u64,
    log: MockLog,
}

impl CameraDriver for MockDriver {
    fn open(node: u32, format: &Format) -> Result<Self> {
        SCRIPT.with(|state| {
            let state = state.borrow();
            state.log.push(format!("open {node}"));
            if state.script.accepted_node != Some(node) {
                return Err(CameraError::Stream(format!("mock node {node} unavailable")));
            }
            state.log.push(format!("opened {node}"));
            Ok(Self {
                format: *format,
                fill: state.script.frame_fill,
                compressed: state.script.compressed_frame.clone(),
                fail_initialize: state.script.fail_initialize,
                fail_stop_streaming: state.script.fail_stop_streaming,
                grab_delay: state.script.grab_delay,
                frames_grabbed: 0,
                log: state.log.clone(),
            })
        })
    }

    fn initialize(&mut self) -> Result<()> {
        self.log.push("initialize");
        if self.fail_initialize {
            return Err(CameraError::DeviceInit("mock buffer setup refused".to_owned()));
        }
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<()> {
        self.log.push("start_streaming");
        Ok(())
    }

    fn stop_streaming(&mut self) -> Result<()> {
        self.log.push("stop_streaming");
        if self.fail_stop_streaming {
            return Err(CameraError::Stream("mock streamoff refused".to_owned()));
        }
        Ok(())
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.log.push("uninitialize");
        Ok(())
    }

    fn grab_preview_frame(&mut self, dest: &mut [u8]) -> Result<usize> {
        std::thread::sleep(self.grab_delay);
        // Vary the fill slightly so consecutive frames are distinguishable.
        let tint = (self.frames_grabbed % 7) as u8;
        self.frames_grabbed += 1;
        let len = self.format.yuyv_size().min(dest.len());
        dest[..len].fill(self.fill.wrapping_add(tint));
        Ok(len)
    }

    fn grab_compressed_frame(&mut self) -> Result<Vec<u8>> {
        std::thread::sleep(self.grab_delay);
        self.log.push("grab_compressed");
        Ok(self.compressed.clone())
    }
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        self.log.push("drop");
    }
}

/// A listener event captured by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    /// `notify` call.
    Notify {
        /// Message type delivered.
        msg: MsgType,
        /// First extra argument.
        ext1: i32,
        /// Second extra argument.
        ext2: i32,
    },
    /// `post_data` call (payload length only).
    Data {
        /// Message type delivered.
        msg: MsgType,
        /// Payload size in bytes.
        len: usize,
    },
    /// `post_data_timestamp` call.
    DataTimestamp {
        /// Message type delivered.
        msg: MsgType,
        /// Payload size in bytes.
        len: usize,
        /// Monotonic timestamp in nanoseconds.
        timestamp_ns: i64,
    },
}

/// Listener that records every callback for later assertions.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    /// Create an empty recording listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured events in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `post_data` deliveries for `msg`.
    #[must_use]
    pub fn data_count(&self, msg: MsgType) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ListenerEvent::Data { msg: m, .. } if *m == msg))
            .count()
    }

    /// Number of timestamped deliveries for `msg`.
    #[must_use]
    pub fn timestamped_count(&self, msg: MsgType) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ListenerEvent::DataTimestamp { msg: m, .. } if *m == msg))
            .count()
    }

    /// Block until at least `count` `post_data` deliveries for `msg` arrived.
    ///
    /// Returns false on timeout.
    pub fn wait_for_data(&self, msg: MsgType, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.data_count(msg) >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// Block until at least `count` timestamped deliveries for `msg` arrived.
    ///
    /// Returns false on timeout.
    pub fn wait_for_timestamped(&self, msg: MsgType, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.timestamped_count(msg) >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn record(&self, event: ListenerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl CameraListener for RecordingListener {
    fn notify(&self, msg: MsgType, ext1: i32, ext2: i32) {
        self.record(ListenerEvent::Notify { msg, ext1, ext2 });
    }

    fn post_data(&self, msg: MsgType, data: &[u8]) {
        self.record(ListenerEvent::Data {
            msg,
            len: data.len(),
        });
    }

    fn post_data_timestamp(&self, timestamp_ns: i64, msg: MsgType, data: &[u8]) {
        self.record(ListenerEvent::DataTimestamp {
            msg,
            len: data.len(),
            timestamp_ns,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FourCC;

    #[test]
    fn test_scripted_open_accepts_single_node() {
        let _log = script(|s| s.accepted_node = Some(2));
        let format = Format::new(320, 240, FourCC::YUYV);
        assert!(MockDriver::open(0, &format).is_err());
        assert!(MockDriver::open(2, &format).is_ok());
    }

    #[test]
    fn test_grab_fills_frame() {
        let _log = script(|s| s.frame_fill = 0x7F);
        let format = Format::new(4, 2, FourCC::YUYV);
        let mut driver = MockDriver::open(0, &format).expect("open");
        let mut buf = vec![0u8; format.yuyv_size()];
        let written = driver.grab_preview_frame(&mut buf).expect("grab");
        assert_eq!(written, format.yuyv_size());
        assert!(buf.iter().all(|&b| b == 0x7F));
    }

    #[test]
    fn test_log_records_lifecycle_order() {
        let log = script(|s| s.accepted_node = Some(0));
        let format = Format::new(320, 240, FourCC::YUYV);
        let mut driver = MockDriver::open(0, &format).expect("open");
        driver.initialize().expect("initialize");
        driver.start_streaming().expect("start");
        drop(driver);
        assert_eq!(
            log.events(),
            vec!["open 0", "opened 0", "initialize", "start_streaming", "drop"]
        );
    }
}
