//! barber-session: The capture session state machine.
//!
//! A [`Session`] holds what the user has picked so far (a face photo, a
//! hairstyle, the last swap result) and moves between states as inputs
//! arrive and swaps run. Front-ends drive it through its transition methods
//! and render from [`Session::snapshot`].

pub mod error;
pub mod session;
pub mod upload;

pub use error::SessionError;
pub use session::{
    Selection, Session, SessionOptions, SessionSnapshot, SessionState, SkipReason, SourceImage,
    SourceMode, SwapOutcome,
};
pub use upload::Upload;
