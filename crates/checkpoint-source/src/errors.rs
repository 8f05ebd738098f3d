use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Error document returned by the object store.
    #[error("object store error for {url}: {code}: {message}")]
    Storage {
        url: String,
        code: String,
        message: String,
    },

    #[error("malformed checkpoint from {origin}: {reason}")]
    Decode { origin: String, reason: String },

    #[error("checkpoint from {origin} is for block {got_height}/{got_hash}, wanted {height}/{hash}")]
    WrongBlock {
        origin: String,
        height: u64,
        hash: String,
        got_height: u64,
        got_hash: String,
    },

    #[error("no checkpoint for {height}/{hash} in namespace {namespace_id}")]
    NotFound {
        namespace_id: String,
        height: u64,
        hash: String,
    },

    #[error("namespace {0} holds no data")]
    EmptyNamespace(String),

    #[error("source setup: {0}")]
    Setup(String),
}

impl SourceError {
    /// Whether the same fetch could succeed if retried right away.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let status = |status| SourceError::Status {
            url: "u".into(),
            status,
        };
        assert!(SourceError::Transport {
            url: "u".into(),
            reason: "connection reset".into()
        }
        .is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!SourceError::Decode {
            origin: "u".into(),
            reason: "eof".into()
        }
        .is_transient());
        assert!(!SourceError::EmptyNamespace("ns".into()).is_transient());
    }
}
