//! Module factory and static camera capability table.
//!
//! Replaces a process-wide singleton: the factory keeps a weak registry per
//! camera id and only constructs a new module when no strong reference to the
//! previous one survives. The strong owner is always the external caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::debug;

use crate::hal::CameraHardware;
use crate::traits::CameraDriver;

/// Which way a camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Away from the user.
    Back,
    /// Toward the user.
    Front,
}

/// Static capability record for one physical camera.
#[derive(Debug, Clone, Copy)]
pub struct CameraInfo {
    /// Facing direction.
    pub facing: Facing,
    /// Clockwise rotation of the sensor relative to the display, in degrees.
    pub orientation: i32,
}

/// The fixed set of physical cameras this module serves.
pub static CAMERA_INFO: [CameraInfo; 1] = [CameraInfo {
    facing: Facing::Back,
    orientation: 0,
}];

/// Number of physical cameras.
#[must_use]
pub fn number_of_cameras() -> usize {
    CAMERA_INFO.len()
}

/// Capability record for a camera id. Ids at or beyond
/// [`number_of_cameras`] return `None`; respecting the reported count is the
/// caller's responsibility.
#[must_use]
pub fn camera_info(id: usize) -> Option<&'static CameraInfo> {
    CAMERA_INFO.get(id)
}

/// Factory handing out reference-counted camera modules.
pub struct CameraFactory<D: CameraDriver + 'static> {
    registry: Mutex<HashMap<i32, Weak<CameraHardware<D>>>>,
}

impl<D: CameraDriver + 'static> Default for CameraFactory<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: CameraDriver + 'static> CameraFactory<D> {
    /// Create an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// Open the module for `id`, reusing the live instance when one exists.
    pub fn open(&self, id: i32) -> Arc<CameraHardware<D>> {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = registry.get(&id).and_then(Weak::upgrade) {
            debug!("open camera {id}: reusing live instance");
            return existing;
        }

        debug!("open camera {id}: constructing");
        let hardware = Arc::new(CameraHardware::new(id));
        registry.insert(id, Arc::downgrade(&hardware));
        hardware
    }
}
