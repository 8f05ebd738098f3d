use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Readiness of the runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Fetching checkpoints for a new block.
    Syncing = 0,
    /// Sources disagree and candidates are being re-derived.
    Verifying = 1,
    /// A trusted checkpoint is published.
    Active = 2,
}

impl Status {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syncing => "syncing",
            Self::Verifying => "verifying",
            Self::Active => "ready",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Verifying,
            2 => Self::Active,
            _ => Self::Syncing,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`Status`] readable without locking.
#[derive(Debug)]
pub struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    pub fn new(status: Status) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub fn load(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, status: Status) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Stores `status` and returns the previous one.
    pub fn swap(&self, status: Status) -> Status {
        Status::from_u8(self.0.swap(status as u8, Ordering::AcqRel))
    }
}

impl Default for AtomicStatus {
    fn default() -> Self {
        Self::new(Status::Syncing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_status() {
        let status = AtomicStatus::default();
        assert_eq!(status.load(), Status::Syncing);
        assert_eq!(status.swap(Status::Verifying), Status::Syncing);
        status.store(Status::Active);
        assert!(status.load().is_active());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::Syncing.to_string(), "syncing");
        assert_eq!(Status::Verifying.to_string(), "verifying");
        assert_eq!(Status::Active.to_string(), "ready");
    }
}
