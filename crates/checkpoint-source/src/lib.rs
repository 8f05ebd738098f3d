//! Origins of committee checkpoints: object-storage buckets and data-availability namespaces.

mod da;
mod errors;
mod http_da;
mod s3;
mod source;

#[cfg(any(test, feature = "test-utils"))]
pub use da::MockDaNamespaceReader;
pub use da::{DaCheckpointSource, DaNamespaceReader, DA_PAGE_SIZE};
pub use errors::SourceError;
pub use http_da::HttpDaNamespaceReader;
#[cfg(any(test, feature = "test-utils"))]
pub use source::MockCheckpointSource;
pub use s3::S3CheckpointSource;
pub use source::CheckpointSource;
