//! Demo binary: run a short preview from camera 0 and print delivery stats.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use v4l2_camera_hal::traits::{MSG_PREVIEW_FRAME, MSG_VIDEO_FRAME};
use v4l2_camera_hal::{camera_info, number_of_cameras, CameraFactory, CameraListener, MsgType, V4l2Driver};

struct PrintingListener {
    frames: AtomicUsize,
}

impl CameraListener for PrintingListener {
    fn notify(&self, msg: MsgType, ext1: i32, ext2: i32) {
        println!("notify: msg={msg:#06x} ext1={ext1} ext2={ext2}");
    }

    fn post_data(&self, msg: MsgType, data: &[u8]) {
        let count = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        println!("frame {count}: msg={msg:#06x} {} bytes", data.len());
    }

    fn post_data_timestamp(&self, timestamp_ns: i64, msg: MsgType, data: &[u8]) {
        println!("video frame: ts={timestamp_ns}ns msg={msg:#06x} {} bytes", data.len());
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> v4l2_camera_hal::Result<()> {
    println!("cameras: {}", number_of_cameras());
    if let Some(info) = camera_info(0) {
        println!("camera 0: facing={:?} orientation={}", info.facing, info.orientation);
    }

    let factory = CameraFactory::<V4l2Driver>::new();
    let camera = factory.open(0);

    camera.set_listener(Arc::new(PrintingListener {
        frames: AtomicUsize::new(0),
    }));
    camera.enable_msg_type(MSG_PREVIEW_FRAME | MSG_VIDEO_FRAME);

    camera.start_preview()?;
    std::thread::sleep(Duration::from_secs(2));
    camera.stop_preview();
    camera.release();
    Ok(())
}
