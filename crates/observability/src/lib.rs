//! Tracing/logging setup shared by every binary.

pub mod subscriber;

pub use subscriber::{LogFormat, UnknownLogFormat};

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    subscriber::init(format);
}
