//! Persistent record of sources convicted of serving a wrong checkpoint.

mod errors;
mod file;
mod sink;

pub use errors::DenylistError;
pub use file::{load, prune_sources, JsonLinesDenylist};
#[cfg(any(test, feature = "test-utils"))]
pub use sink::MockDenylistSink;
pub use sink::DenylistSink;
