//! Document sources: discovery, staging and completion marking.
//!
//! A source is where "ready" documents wait for delivery. Two variants
//! are provided:
//!
//! - [`FolderSource`]: a shared directory; delivered files are renamed
//!   with a `processed-` prefix.
//! - [`BucketSource`]: an object store behind the [`ObjectStore`]
//!   capability; delivered objects are copied to a `.processed` key and
//!   the original is deleted. Objects are downloaded into a local staging
//!   directory before transfer.
//!
//! The reconciliation loop only sees the [`DocumentSource`] trait.

mod bucket;
mod dir_bucket;
mod document;
mod error;
mod folder;
mod naming;
mod staging;

use std::future::Future;
use std::pin::Pin;

pub use bucket::{BucketSource, ObjectInfo, ObjectStore};
pub use dir_bucket::DirBucket;
pub use document::{Document, MarkOutcome};
pub use error::SourceError;
pub use folder::FolderSource;
pub use naming::{CandidateFilter, Marker};
pub use staging::StagedDocument;

/// Default candidate suffix.
pub const DEFAULT_SUFFIX: &str = ".pdf";

/// Prefix marking a delivered file in a folder source.
pub const FOLDER_PROCESSED_PREFIX: &str = "processed-";

/// Suffix marking a delivered object in a bucket source.
pub const BUCKET_PROCESSED_SUFFIX: &str = ".processed";

/// A boxed future returned by source operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Enumerates documents waiting for delivery.
pub trait SourceLister: Send + Sync {
    /// Returns the pending documents, ordered lexically by id.
    ///
    /// Documents bearing the processed marker and documents without the
    /// expected suffix are never returned.
    fn list(&self) -> SourceFuture<'_, Vec<Document>>;
}

/// Makes a document's bytes available as a local file.
pub trait Stager: Send + Sync {
    /// Stages a document for transfer.
    ///
    /// The returned handle removes any temporary copy when dropped.
    fn stage<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, StagedDocument>;
}

/// Durably records that a document has been delivered.
pub trait CompletionMarker: Send + Sync {
    /// Marks a document as delivered.
    ///
    /// Calling this again for an already-marked document is not an error.
    fn mark_delivered<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, MarkOutcome>;
}

/// Everything the reconciliation loop needs from a source.
pub trait DocumentSource: SourceLister + Stager + CompletionMarker {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}
