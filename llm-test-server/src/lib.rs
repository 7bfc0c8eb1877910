//! Stub chat-completions provider used while developing docs-chatbot.
//!
//! Speaks just enough of the OpenAI chat-completions protocol for the
//! chatbot's client, and can be switched into failure modes (slow, HTTP
//! error, malformed body) to exercise the local-search fallback.

pub mod server;

pub use server::{
    run_with_args, spawn_stub, CliArgs, StubHandle, StubMode, DEFAULT_HOST, DEFAULT_PORT,
    STUB_ANSWER_PREFIX,
};
