//! barber-capture: Webcam snapshot plumbing.
//!
//! The video transport lives outside this crate. A producer publishes raw
//! BGR frames into a [`FrameSlot`]; the session pulls the most recent one
//! when the user asks for a snapshot.

pub mod frame;
pub mod slot;

pub use frame::{BgrFrame, FrameError};
pub use slot::{FrameSlot, FrameSource};
