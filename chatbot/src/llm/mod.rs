//! Hosted model access.

pub mod client;
pub mod request_builder;

pub use client::{LlmClient, LlmError};
