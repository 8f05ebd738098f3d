//! Identity of a checkpoint origin.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object-storage bucket a committee indexer uploads its checkpoints to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct S3Source {
    pub region: String,
    pub bucket: String,
    pub name: String,
}

/// Data-availability namespace a committee indexer publishes its checkpoints to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaSource {
    pub network: String,
    #[serde(alias = "namespaceID")]
    pub namespace_id: String,
    pub name: String,
}

/// Identifies exactly one checkpoint source.
///
/// Used for attribution of disagreements and as the key of denylist entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceDescriptor {
    #[serde(rename = "sourceS3")]
    S3(S3Source),
    #[serde(rename = "sourceDa")]
    Da(DaSource),
}

impl SourceDescriptor {
    /// Name of the committee indexer behind this source.
    pub fn name(&self) -> &str {
        match self {
            Self::S3(s) => &s.name,
            Self::Da(d) => &d.name,
        }
    }
}

impl From<S3Source> for SourceDescriptor {
    fn from(value: S3Source) -> Self {
        Self::S3(value)
    }
}

impl From<DaSource> for SourceDescriptor {
    fn from(value: DaSource) -> Self {
        Self::Da(value)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3(s) => write!(f, "s3://{}/{}@{}", s.bucket, s.name, s.region),
            Self::Da(d) => write!(f, "da://{}/{}/{}", d.network, d.namespace_id, d.name),
        }
    }
}
