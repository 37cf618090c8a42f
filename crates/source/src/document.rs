//! Document model.

use std::fmt;

/// A document waiting at the source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Object key or file name, relative to the source root.
    pub id: String,
    /// Size in bytes at listing time.
    pub size: u64,
}

impl Document {
    pub fn new(id: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }

    /// Final path component of the id; the name used on the remote side.
    pub fn name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Result of marking a document as delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The document was moved to its processed name.
    Marked,
    /// A stale processed copy existed and was overwritten.
    Replaced,
    /// A processed copy already existed; the source copy was deleted.
    DuplicateDiscarded,
    /// Only the processed copy exists; nothing to do.
    AlreadyMarked,
}
