//! Latest-frame slot shared between a camera producer and the session.

use crate::frame::BgrFrame;
use std::sync::{Arc, Mutex, PoisonError};

/// Pull source for camera snapshots: "give me the latest frame".
pub trait FrameSource {
    fn latest_frame(&self) -> Option<BgrFrame>;
}

/// Single-frame mailbox. Each `publish` replaces the previous frame; there
/// is no queue, so a reader always sees the most recent complete frame.
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<BgrFrame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot with a new frame.
    pub fn publish(&self, frame: BgrFrame) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = slot.as_ref() {
            tracing::trace!(replaced = prev.sequence, sequence = frame.sequence, "frame published");
        }
        *slot = Some(frame);
    }

    /// Drop the stored frame (camera stopped).
    pub fn clear(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl FrameSource for FrameSlot {
    fn latest_frame(&self) -> Option<BgrFrame> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
