use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenylistError {
    #[error("denylist {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding denylist entry: {0}")]
    Encode(#[from] serde_json::Error),
}
