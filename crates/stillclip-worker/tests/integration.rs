//! Integration test runner.
//!
//! Run all integration tests:
//!   cargo test -p stillclip-worker --test integration
//!
//! Tests that drive real media tools return early, with a note on stderr,
//! when ffmpeg or ffprobe is not on PATH.

#[path = "integration/mod.rs"]
mod integration;
