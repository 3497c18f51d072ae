use barber_capture::FrameError;
use barber_core::{NormalizeError, StoreError};
use barber_swap::SwapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("image decode failed: {0}")]
    Decode(#[from] NormalizeError),
    #[error("upload rejected: {0}")]
    Validation(String),
    #[error("temp file error: {0}")]
    Io(#[from] StoreError),
    #[error("bad camera frame: {0}")]
    Frame(#[from] FrameError),
    #[error("no camera frame available")]
    NoFrame,
    #[error("face swap interrupted before the model answered")]
    Interrupted,
    #[error(transparent)]
    Swap(#[from] SwapError),
}

impl SessionError {
    /// Sentence to show the user in place of the raw error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(e) => format!("The image could not be read ({e})."),
            Self::Validation(msg) => format!("Unsupported file: {msg}. Please send a JPG or PNG photo."),
            Self::Io(e) => format!("Could not save a temporary image: {e}."),
            Self::Frame(e) => format!("The camera snapshot is unusable ({e})."),
            Self::NoFrame => "The camera has not produced a frame yet. Please try again.".into(),
            Self::Interrupted => "The face swap was interrupted. Please try again.".into(),
            Self::Swap(SwapError::Configuration(msg)) => {
                format!("Face swap is not configured: {msg}.")
            }
            Self::Swap(SwapError::Timeout(after)) => format!(
                "The face-swap service did not answer within {}s. Please try again.",
                after.as_secs()
            ),
            Self::Swap(SwapError::Network(msg)) => {
                format!("Could not reach the face-swap service: {msg}.")
            }
            Self::Swap(SwapError::RemoteModel(msg)) => format!("Face swap failed: {msg}"),
            Self::Swap(e) => format!("Face swap failed: {e}."),
        }
    }
}
