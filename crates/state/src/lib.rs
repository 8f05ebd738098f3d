//! Runtime state served to API consumers: the trusted checkpoint and the sync status.

mod errors;
pub mod poller;
mod runtime;
mod status;

#[cfg(test)]
mod test_utils;

pub use errors::UpdateError;
pub use runtime::RuntimeState;
pub use status::{AtomicStatus, Status};
