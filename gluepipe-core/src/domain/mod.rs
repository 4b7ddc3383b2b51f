//! Core domain types
//!
//! Everything here is request-scoped: built from one invocation's payload,
//! read by the handlers, and dropped when the invocation completes.

pub mod completion;
pub mod config;
pub mod directive;
pub mod event;
