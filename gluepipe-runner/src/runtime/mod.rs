//! Lambda runtime layer
//!
//! Fetches invocations from the Lambda Runtime API, hands stage events to
//! the dispatcher and posts the completion result back as the response.

pub mod client;
pub mod poller;

pub use client::{HttpRuntimeApi, RuntimeApi, RuntimeError};
pub use poller::InvocationPoller;
