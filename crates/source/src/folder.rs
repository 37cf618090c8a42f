//! Shared-folder source.
//!
//! Candidates are the regular files directly under the root whose names
//! end with the candidate suffix. Delivery is recorded by renaming the
//! file with the processed prefix, replacing any file already at that name.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::document::{Document, MarkOutcome};
use crate::error::SourceError;
use crate::naming::{CandidateFilter, Marker};
use crate::staging::StagedDocument;
use crate::{
    CompletionMarker, DEFAULT_SUFFIX, DocumentSource, FOLDER_PROCESSED_PREFIX, SourceFuture,
    SourceLister, Stager,
};

/// A directory of documents, processed in place.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
    filter: CandidateFilter,
}

impl FolderSource {
    /// Creates a folder source with the default `.pdf` suffix and
    /// `processed-` prefix.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_filter(
            root,
            CandidateFilter::new(DEFAULT_SUFFIX, Marker::Prefix(FOLDER_PROCESSED_PREFIX.into())),
        )
    }

    pub fn with_filter(root: impl Into<PathBuf>, filter: CandidateFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn scan(&self) -> Result<Vec<Document>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut docs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if self.filter.is_candidate(&name) {
                docs.push(Document::new(name, metadata.len()));
            }
        }

        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn mark(&self, doc: &Document) -> Result<MarkOutcome, SourceError> {
        let source = self.root.join(&doc.id);
        let target = self.root.join(self.filter.marker().apply(&doc.id));

        let source_exists = tokio::fs::try_exists(&source).await?;
        let target_exists = tokio::fs::try_exists(&target).await?;

        if !source_exists {
            return if target_exists {
                debug!(doc = %doc, "already marked");
                Ok(MarkOutcome::AlreadyMarked)
            } else {
                Err(SourceError::NotFound(doc.id.clone()))
            };
        }

        // rename() replaces an existing destination on every supported platform.
        tokio::fs::rename(&source, &target).await?;
        info!(doc = %doc, target = %target.display(), "marked as processed");

        Ok(if target_exists {
            MarkOutcome::Replaced
        } else {
            MarkOutcome::Marked
        })
    }
}

impl SourceLister for FolderSource {
    fn list(&self) -> SourceFuture<'_, Vec<Document>> {
        Box::pin(self.scan())
    }
}

impl Stager for FolderSource {
    fn stage<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, StagedDocument> {
        Box::pin(async move {
            let path = self.root.join(&doc.id);
            // Fail early on unreadable files rather than inside the transport.
            tokio::fs::File::open(&path).await?;
            Ok(StagedDocument::in_place(path))
        })
    }
}

impl CompletionMarker for FolderSource {
    fn mark_delivered<'a>(&'a self, doc: &'a Document) -> SourceFuture<'a, MarkOutcome> {
        Box::pin(self.mark(doc))
    }
}

impl DocumentSource for FolderSource {
    fn describe(&self) -> String {
        format!("folder {}", self.root.display())
    }
}
