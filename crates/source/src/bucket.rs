//! Object-store source.
//!
//! Objects are downloaded into a local staging directory before transfer.
//! Delivery is recorded by copying the object to `<key>.processed` and
//! deleting the original.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::document::{Document, MarkOutcome};
use crate::error::SourceError;
use crate::naming::{CandidateFilter, Marker};
use crate::staging::StagedDocument;
use crate::{
    BUCKET_PROCESSED_SUFFIX, CompletionMarker, DEFAULT_SUFFIX, DocumentSource, SourceFuture,
    SourceLister, Stager,
};

/// An object as reported by a store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// Minimal object-store capability (list/get/copy/delete by key).
///
/// Client-specific implementations live outside this crate; [`DirBucket`]
/// maps keys onto a local directory.
///
/// [`DirBucket`]: crate::DirBucket
pub trait ObjectStore: Send + Sync {
    /// Returns a short identifier for logs.
    fn name(&self) -> &str;

    /// Lists every object in the store.
    fn list_keys(&self) -> SourceFuture<'_, Vec<ObjectInfo>>;

    /// Downloads an object into `dest`, returning the bytes written.
    fn download<'a>(&'a self, key: &'a str, dest: &'a std::path::Path) -> SourceFuture<'a, u64>;

    /// Returns true if the key exists.
    fn exists<'a>(&'a self, key: &'a str) -> SourceFuture<'a, bool>;

    /// Copies an object, overwriting `to` if present.
    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> SourceFuture<'a, ()>;

    /// Deletes an object. Deleting a missing key succeeds.
    fn delete<'a>(&'a self, key: &'a str) -> SourceFuture<'a, ()>;
}

/// A bucket of documents staged through a local directory.
pub struct BucketSource<S> {
    store: S,
    staging_dir: PathBuf,
    filter: CandidateFilter,
}

impl<S: ObjectStore> BucketSource<S> {
    /// Creates a bucket source with the default `.pdf` suffix and
    /// `.processed` marker.
    pub fn new(store: S, staging_dir: impl Into<PathBuf>) -> Self {
        Self::with_filter(
            store,
            staging_dir,
            CandidateFilter::new(DEFAULT_SUFFIX, Marker::Suffix(BUCKET_PROCESSED_SUFFIX.into())),
        )
    }

    pub fn with_filter(store: S, staging_dir: impl Into<PathBuf>, filter: CandidateFilter) -> Self {
        Self {
            store,
            staging_dir: staging_dir.into(),
            filter,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn scan(&self) -> Result<Vec<Document>, SourceError> {
        let mut docs: Vec<Document> = self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter(|obj| self.filter.is_candidate(&obj.key))
            .map(|obj| Document::new(obj.key, obj.size))
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn download(&self, doc: &Document) -> Result<StagedDocument, SourceError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;

        let staged = StagedDocument::temporary(self.staging_dir.join(doc.name()));
        let bytes = self.store.download(&doc.id, staged.path()).await?;
        debug!(doc = %doc, bytes, path = %staged.path().display(), "downloaded to staging");

        Ok(staged)
    }

    async fn mark(&self, doc: &Document) -> Result<MarkOutcome, SourceError> {
        let target = self.filter.marker().apply(&doc.id);

        let source_exists = self.store.exists(&doc.id).await?;
        let target_exists = self.store.exists(&target).await?;

        match (source_exists, target_exists) {
            (false, true) => {
                debug!(doc = %doc, "already marked");
                Ok(MarkOutcome::AlreadyMarked)
            }
            (false, false) => Err(SourceError::NotFound(doc.id.clone())),
            (true, true) => {
                warn!(doc = %doc, target = %target, "processed copy exists, discarding original");
                self.store.delete(&doc.id).await?;
                Ok(MarkOutcome::DuplicateDiscarded)
            }
            (true, false) => {
                self.store.copy(&doc.id, &target).await?;
                self.store.delete(&doc.id).await?;
                info!(doc = %doc, target = %target, "marked as processed");
                Ok(MarkOutcome::Marked)
            }
        }
    }
}

impl<S: ObjectStore> SourceLister for BucketSource<S> {
    fn list(&self) -> SourceFuture<'_, Vec<Document>> {
        Box::pin(self.scan())
    }
}

impl<S: ObjectStore> Stager for BucketSource<S> {
    fn stage<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, StagedDocument> {
        Box::pin(self.download(doc))
    }
}

impl<S: ObjectStore> CompletionMarker for BucketSource<S> {
    fn mark_delivered<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, MarkOutcome> {
        Box::pin(self.mark(doc))
    }
}

impl<S: ObjectStore> DocumentSource for BucketSource<S> {
    fn describe(&self) -> String {
        format!("bucket {}", self.store.name())
    }
}
