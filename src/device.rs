//! Production camera driver backed by the v4l crate.

use log::debug;
use ouroboros::self_referencing;
use v4l::buffer::Type;
use v4l::io::traits::{CaptureStream as V4lCaptureStream, Stream as V4lStream};
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{CameraDriver, CameraError, Format, FourCC, Result};

/// Number of mmap capture buffers requested from the kernel.
const BUFFER_COUNT: u32 = 4;

/// The mmap stream borrows the device it was created from, so the two live
/// together for the initialized phase of the lifecycle.
#[self_referencing]
struct StreamState {
    device: Device,
    #[borrows(mut device)]
    #[covariant]
    stream: MmapStream<'this>,
}

/// V4L2 camera driver using mmap streaming.
///
/// Between `open` and `initialize` only the device is held; `initialize`
/// pairs it with a buffer stream and `uninitialize` splits them again.
pub struct V4l2Driver {
    node: u32,
    device: Option<Device>,
    streaming: Option<StreamState>,
}

impl CameraDriver for V4l2Driver {
    fn open(node: u32, format: &Format) -> Result<Self> {
        let device = Device::new(node as usize)
            .map_err(|err| CameraError::Stream(format!("open /dev/video{node}: {err}")))?;

        let mut fmt = device
            .format()
            .map_err(|err| CameraError::Stream(format!("query format: {err}")))?;
        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();

        let actual = device
            .set_format(&fmt)
            .map_err(|err| CameraError::Stream(format!("set format: {err}")))?;

        // The session contract is exact-match negotiation; a driver that
        // silently substitutes geometry or format counts as a rejection.
        if actual.width != format.width
            || actual.height != format.height
            || FourCC::from(actual.fourcc) != format.fourcc
        {
            return Err(CameraError::Stream(format!(
                "node {node} negotiated {}x{} {:?} instead of {}x{} {:?}",
                actual.width,
                actual.height,
                actual.fourcc,
                format.width,
                format.height,
                format.fourcc
            )));
        }

        debug!("opened /dev/video{node} at {}x{}", actual.width, actual.height);
        Ok(Self {
            node,
            device: Some(device),
            streaming: None,
        })
    }

    fn initialize(&mut self) -> Result<()> {
        let device = self
            .device
            .take()
            .ok_or_else(|| CameraError::DeviceInit("device not open".to_owned()))?;

        let state = StreamStateTryBuilder {
            device,
            stream_builder: |device| {
                MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
                    .map_err(|err| CameraError::DeviceInit(err.to_string()))
            },
        }
        .try_build()?;

        self.streaming = Some(state);
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<()> {
        let state = self.require_streaming("start_streaming")?;
        state
            .with_stream_mut(|stream| V4lStream::start(stream))
            .map_err(|err| CameraError::Stream(format!("streamon: {err}")))
    }

    fn stop_streaming(&mut self) -> Result<()> {
        // Tolerates being called after uninitialize, as teardown does.
        match self.streaming.as_mut() {
            Some(state) => state
                .with_stream_mut(|stream| V4lStream::stop(stream))
                .map_err(|err| CameraError::Stream(format!("streamoff: {err}"))),
            None => Ok(()),
        }
    }

    fn uninitialize(&mut self) -> Result<()> {
        if let Some(state) = self.streaming.take() {
            // Dropping the stream releases the kernel buffers; keep the
            // device so the session can be re-initialized or closed.
            self.device = Some(state.into_heads().device);
        }
        Ok(())
    }

    fn grab_preview_frame(&mut self, dest: &mut [u8]) -> Result<usize> {
        let node = self.node;
        let state = self.require_streaming("grab_preview_frame")?;
        state.with_stream_mut(|stream| {
            let (buf, meta) = stream
                .next()
                .map_err(|err| CameraError::Stream(format!("frame grab on node {node}: {err}")))?;
            let used = frame_len(buf, meta).min(dest.len());
            dest[..used].copy_from_slice(&buf[..used]);
            Ok(used)
        })
    }

    fn grab_compressed_frame(&mut self) -> Result<Vec<u8>> {
        let node = self.node;
        let state = self.require_streaming("grab_compressed_frame")?;
        state.with_stream_mut(|stream| {
            let (buf, meta) = stream
                .next()
                .map_err(|err| CameraError::Stream(format!("frame grab on node {node}: {err}")))?;
            Ok(buf[..frame_len(buf, meta)].to_vec())
        })
    }
}

impl V4l2Driver {
    fn require_streaming(&mut self, op: &str) -> Result<&mut StreamState> {
        self.streaming
            .as_mut()
            .ok_or_else(|| CameraError::Stream(format!("{op} before initialize")))
    }
}

/// Bytes actually filled in a dequeued buffer. Some drivers report zero
/// `bytesused`; fall back to the full mapping in that case.
fn frame_len(buf: &[u8], meta: &v4l::buffer::Metadata) -> usize {
    if meta.bytesused == 0 {
        buf.len()
    } else {
        (meta.bytesused as usize).min(buf.len())
    }
}
