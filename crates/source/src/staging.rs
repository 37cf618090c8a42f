//! Local copies of documents prepared for transfer.

use std::path::{Path, PathBuf};

/// A document available as a local file.
///
/// In-place documents (folder source) are left untouched on drop.
/// Temporary copies (bucket source) are deleted on drop, so a staging file
/// never outlives the pass that created it, whatever the exit path.
#[derive(Debug)]
pub struct StagedDocument {
    path: PathBuf,
    temporary: bool,
}

impl StagedDocument {
    /// Wraps a file that already lives at the source.
    pub fn in_place(path: PathBuf) -> Self {
        Self {
            path,
            temporary: false,
        }
    }

    /// Takes ownership of a temporary file.
    ///
    /// Create the guard before writing the file so that a failed download
    /// is cleaned up too.
    pub fn temporary(path: PathBuf) -> Self {
        Self {
            path,
            temporary: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for StagedDocument {
    fn drop(&mut self) {
        if !self.temporary {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed staging file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging file")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"pdf").unwrap();

        let staged = StagedDocument::temporary(path.clone());
        assert!(staged.is_temporary());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn in_place_file_survives_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"pdf").unwrap();

        drop(StagedDocument::in_place(path.clone()));
        assert!(path.exists());
    }

    #[test]
    fn missing_temporary_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        drop(StagedDocument::temporary(dir.path().join("never-written.pdf")));
    }
}
