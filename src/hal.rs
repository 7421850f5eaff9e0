//! Camera hardware module: the host-facing lifecycle surface.
//!
//! One [`CameraHardware`] instance per physical camera. A module-wide mutex
//! guards session, worker, and parameter state; the stop flag, message mask,
//! and recording flag are atomics so the acquisition loop never reads an
//! unsynchronized boolean. Callbacks run synchronously on worker threads.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::convert::yuyv422_to_yuv420sp;
use crate::params::{Parameters, KEY_SUPPORTED_PREVIEW_FPS_RANGE, SUPPORTED_FPS_RANGES};
use crate::session::{DeviceSession, DEVICE_NODE_CANDIDATES};
use crate::traits::{
    CameraDriver, CameraError, CameraListener, Format, FourCC, MsgType, Result,
    MSG_COMPRESSED_IMAGE, MSG_FOCUS, MSG_PREVIEW_FRAME, MSG_SHUTTER, MSG_VIDEO_FRAME,
};

/// State shared between the host-facing surface and worker threads.
struct Shared {
    listener: Mutex<Option<Arc<dyn CameraListener>>>,
    msg_enabled: AtomicU32,
    recording: AtomicBool,
    preview_stopped: AtomicBool,
    epoch: Instant,
}

impl Shared {
    fn listener(&self) -> Option<Arc<dyn CameraListener>> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn msg_type_enabled(&self, msg: MsgType) -> bool {
        self.msg_enabled.load(Ordering::Acquire) & msg != 0
    }

    /// Monotonic timestamp in nanoseconds for video frame delivery.
    fn monotonic_ns(&self) -> i64 {
        i64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// State mutated only under the module lock.
struct HalState<D: CameraDriver> {
    params: Parameters,
    preview_worker: Option<JoinHandle<DeviceSession<D>>>,
    focus_workers: Vec<JoinHandle<()>>,
}

/// Camera hardware module for one camera id.
pub struct CameraHardware<D: CameraDriver + 'static> {
    id: i32,
    shared: Arc<Shared>,
    state: Mutex<HalState<D>>,
}

impl<D: CameraDriver + 'static> CameraHardware<D> {
    /// Create a module instance with default parameters.
    #[must_use]
    pub fn new(id: i32) -> Self {
        Self {
            id,
            shared: Arc::new(Shared {
                listener: Mutex::new(None),
                msg_enabled: AtomicU32::new(0),
                recording: AtomicBool::new(false),
                preview_stopped: AtomicBool::new(true),
                epoch: Instant::now(),
            }),
            state: Mutex::new(HalState {
                params: Parameters::default(),
                preview_worker: None,
                focus_workers: Vec::new(),
            }),
        }
    }

    /// Camera id this module serves.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Register the host callback sink. Must happen before streaming starts.
    pub fn set_listener(&self, listener: Arc<dyn CameraListener>) {
        *self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Enable delivery of the given message types.
    pub fn enable_msg_type(&self, msg: MsgType) {
        self.shared.msg_enabled.fetch_or(msg, Ordering::AcqRel);
    }

    /// Disable delivery of the given message types.
    pub fn disable_msg_type(&self, msg: MsgType) {
        self.shared.msg_enabled.fetch_and(!msg, Ordering::AcqRel);
    }

    /// Whether any of the given message types is enabled.
    #[must_use]
    pub fn msg_type_enabled(&self, msg: MsgType) -> bool {
        self.shared.msg_type_enabled(msg)
    }

    /// Open a device at the preview geometry and start the acquisition loop.
    ///
    /// Returns `AlreadyRunning` while a previous preview is active.
    pub fn start_preview(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.preview_worker.is_some() {
            return Err(CameraError::AlreadyRunning);
        }

        let (width, height) = state.params.preview_size();
        info!("start_preview: {width}x{height}");
        let format = Format::new(width, height, FourCC::YUYV);
        let mut session = DeviceSession::<D>::open(&DEVICE_NODE_CANDIDATES, format)?;

        if let Err(err) = session.initialize() {
            error!("start_preview: initialize failed: {err}");
            session.close();
            return Err(err);
        }
        if let Err(err) = session.start_streaming() {
            error!("start_preview: start_streaming failed: {err}");
            if let Err(uninit_err) = session.uninitialize() {
                warn!("start_preview: uninitialize after failure: {uninit_err}");
            }
            session.close();
            return Err(err);
        }

        self.shared.preview_stopped.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let worker = std::thread::Builder::new()
            .name("camera-preview".to_owned())
            .spawn(move || preview_loop(session, &shared))?;
        state.preview_worker = Some(worker);
        Ok(())
    }

    /// Signal the acquisition loop to stop, join it, and tear the session
    /// down. Safe to call when no preview is active.
    pub fn stop_preview(&self) {
        let mut state = self.lock_state();
        self.stop_preview_locked(&mut state);
    }

    /// Whether the acquisition loop is active.
    #[must_use]
    pub fn preview_enabled(&self) -> bool {
        self.lock_state().preview_worker.is_some()
    }

    /// Mark recording active. The record buffer is allocated when the first
    /// video frame is converted and dropped when recording stops.
    pub fn start_recording(&self) -> Result<()> {
        if self.shared.recording.swap(true, Ordering::AcqRel) {
            return Err(CameraError::AlreadyRunning);
        }
        Ok(())
    }

    /// Mark recording inactive.
    pub fn stop_recording(&self) {
        self.shared.recording.store(false, Ordering::Release);
    }

    /// Whether recording is active.
    #[must_use]
    pub fn recording_enabled(&self) -> bool {
        self.shared.recording.load(Ordering::Acquire)
    }

    /// Return a recording frame to the module. Frames are only borrowed for
    /// the duration of the callback, so there is nothing to reclaim.
    pub fn release_recording_frame(&self, _frame: &[u8]) {}

    /// Fire-and-forget focus report: a one-shot worker notifies focus
    /// success if focus delivery is enabled. Workers are joined on release.
    pub fn auto_focus(&self) -> Result<()> {
        let mut state = self.lock_state();
        state.focus_workers.retain(|worker| !worker.is_finished());

        let shared = Arc::clone(&self.shared);
        let worker = std::thread::Builder::new()
            .name("camera-autofocus".to_owned())
            .spawn(move || {
                if shared.msg_type_enabled(MSG_FOCUS) {
                    if let Some(listener) = shared.listener() {
                        listener.notify(MSG_FOCUS, 1, 0);
                    }
                }
            })?;
        state.focus_workers.push(worker);
        Ok(())
    }

    /// No-op: there is no focus search to cancel.
    pub fn cancel_auto_focus(&self) -> Result<()> {
        Ok(())
    }

    /// Synchronous still capture.
    ///
    /// Stops any active preview, opens a session at the picture geometry,
    /// and delivers one compressed frame when enabled. A failed probe
    /// returns `NoDeviceAvailable` before any callback fires.
    pub fn take_picture(&self) -> Result<()> {
        let mut state = self.lock_state();
        self.stop_preview_locked(&mut state);

        let (width, height) = state.params.picture_size();
        debug!("take_picture: {width}x{height}");
        let format = Format::new(width, height, FourCC::MJPG);
        let mut session = DeviceSession::<D>::open(&DEVICE_NODE_CANDIDATES, format)?;

        if self.shared.msg_type_enabled(MSG_SHUTTER) {
            if let Some(listener) = self.shared.listener() {
                listener.notify(MSG_SHUTTER, 0, 0);
            }
        }

        let result = self.capture_compressed(&mut session);
        session.teardown();
        result
    }

    /// No-op: still capture is synchronous, there is nothing in flight.
    pub fn cancel_picture(&self) -> Result<()> {
        Ok(())
    }

    /// Replace the stored configuration after validating format invariants.
    ///
    /// On rejection the previous configuration is retained unchanged.
    pub fn set_parameters(&self, params: Parameters) -> Result<()> {
        params.validate()?;

        let mut params = params;
        params.set(KEY_SUPPORTED_PREVIEW_FPS_RANGE, SUPPORTED_FPS_RANGES);
        let (width, height) = params.preview_size();
        debug!(
            "set_parameters: preview {width}x{height} rate={}",
            params.preview_frame_rate()
        );

        self.lock_state().params = params;
        Ok(())
    }

    /// Independent copy of the stored configuration.
    #[must_use]
    pub fn get_parameters(&self) -> Parameters {
        self.lock_state().params.clone()
    }

    /// Extension commands are not supported.
    pub fn send_command(&self, _command: i32, _arg1: i32, _arg2: i32) -> Result<()> {
        Err(CameraError::Rejected)
    }

    /// Diagnostic dump. Nothing to report.
    pub fn dump(&self) -> Result<()> {
        Ok(())
    }

    /// Stop streaming and join every worker this module spawned.
    pub fn release(&self) {
        let mut state = self.lock_state();
        self.stop_preview_locked(&mut state);
        self.shared.recording.store(false, Ordering::Release);
        for worker in state.focus_workers.drain(..) {
            if worker.join().is_err() {
                error!("autofocus worker panicked");
            }
        }
    }

    fn capture_compressed(&self, session: &mut DeviceSession<D>) -> Result<()> {
        session.initialize()?;
        session.start_streaming()?;
        if self.shared.msg_type_enabled(MSG_COMPRESSED_IMAGE) {
            let frame = session.grab_compressed_frame()?;
            if let Some(listener) = self.shared.listener() {
                listener.post_data(MSG_COMPRESSED_IMAGE, &frame);
            }
        }
        Ok(())
    }

    fn stop_preview_locked(&self, state: &mut HalState<D>) {
        self.shared.preview_stopped.store(true, Ordering::Release);
        if let Some(worker) = state.preview_worker.take() {
            match worker.join() {
                Ok(mut session) => session.teardown(),
                Err(_) => error!("preview worker panicked"),
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, HalState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: CameraDriver + 'static> Drop for CameraHardware<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frame acquisition loop, run on the dedicated preview worker.
///
/// Owns the session and the frame buffers for its lifetime; the session is
/// handed back to the joiner for teardown. The raw grab blocks in the driver
/// outside any lock.
fn preview_loop<D: CameraDriver>(
    mut session: DeviceSession<D>,
    shared: &Shared,
) -> DeviceSession<D> {
    let format = session.format();
    let mut preview_buf = vec![0u8; format.yuyv_size()];
    let mut record_buf: Option<Vec<u8>> = None;

    while !shared.preview_stopped.load(Ordering::Acquire) {
        if let Err(err) = session.grab_preview_frame(&mut preview_buf) {
            error!("preview frame grab failed: {err}");
            break;
        }

        let msg = shared.msg_enabled.load(Ordering::Acquire);
        if msg & (MSG_PREVIEW_FRAME | MSG_VIDEO_FRAME) == 0 {
            continue;
        }
        let Some(listener) = shared.listener() else {
            continue;
        };

        if msg & MSG_VIDEO_FRAME != 0 && shared.recording.load(Ordering::Acquire) {
            let record = record_buf.get_or_insert_with(|| vec![0u8; format.yuv420sp_size()]);
            yuyv422_to_yuv420sp(&preview_buf, record, format.width, format.height);
            listener.post_data_timestamp(shared.monotonic_ns(), MSG_VIDEO_FRAME, record);
        } else {
            // Record buffer lives only while recording is active.
            record_buf = None;
        }

        if msg & MSG_PREVIEW_FRAME != 0 {
            listener.post_data(MSG_PREVIEW_FRAME, &preview_buf);
        }
    }

    session
}
