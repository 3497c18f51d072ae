//! barber-swap: Face-swap inference client.
//!
//! The swap itself runs on a hosted Gradio Space. This crate defines the
//! request/response contract ([`FaceSwapClient`]) and an HTTP
//! implementation of it ([`GradioClient`]).

pub mod client;
pub mod error;
pub mod gradio;

pub use client::{FaceSwapClient, SwapParams, SwapRequest};
pub use error::SwapError;
pub use gradio::{GradioClient, SwapConfig};
