//! HTTP handlers.
//!
//! This module organizes the handlers by domain:
//! - `chat`: question answering (`POST /api/chat`)
//! - `documents`: Basic-auth protected raw document access (`/documentos`)
//! - `health`: liveness and configuration summary
//! - `ui`: the browser chat page

pub mod chat;
pub mod documents;
pub mod health;
pub mod ui;

// Re-export handlers for the router in server.rs
pub use chat::*;
pub use documents::*;
pub use health::*;
pub use ui::*;
