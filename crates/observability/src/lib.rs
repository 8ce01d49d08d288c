//! Process-wide tracing setup shared by learnhub binaries.

pub mod subscriber;

pub use subscriber::{LogFormat, init, init_with};
