//! Common helpers for integration tests.
//!
//! - `fixtures`: wiremock mounts for the proxy management API
//! - `logger`: structured per-test logging
//! - `log_capture`: tracing capture for asserting on emitted events

pub mod fixtures;
pub mod log_capture;
pub mod logger;
