//! Naming conventions: which names are candidates, and how a delivered
//! document is renamed so that it is never listed again.

/// How the processed state is encoded in a document's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Prepended to the final path segment (`a.pdf` → `processed-a.pdf`).
    Prefix(String),
    /// Appended to the whole key (`a.pdf` → `a.pdf.processed`).
    Suffix(String),
}

impl Marker {
    /// Returns true if `id` already carries this marker.
    pub fn is_marked(&self, id: &str) -> bool {
        match self {
            Marker::Prefix(p) => basename(id).starts_with(p.as_str()),
            Marker::Suffix(s) => id.ends_with(s.as_str()),
        }
    }

    /// Returns the processed name for `id`.
    pub fn apply(&self, id: &str) -> String {
        match self {
            Marker::Prefix(p) => match id.rsplit_once('/') {
                Some((dir, name)) => format!("{dir}/{p}{name}"),
                None => format!("{p}{id}"),
            },
            Marker::Suffix(s) => format!("{id}{s}"),
        }
    }
}

/// Decides which names at the source are pending documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    suffix: String,
    marker: Marker,
}

impl CandidateFilter {
    pub fn new(suffix: impl Into<String>, marker: Marker) -> Self {
        Self {
            suffix: suffix.into(),
            marker,
        }
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Returns true if `id` has the expected suffix and is not yet marked.
    pub fn is_candidate(&self, id: &str) -> bool {
        has_suffix_ignore_case(id, &self.suffix) && !self.marker.is_marked(id)
    }
}

fn basename(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn has_suffix_ignore_case(id: &str, suffix: &str) -> bool {
    let (id, suffix) = (id.as_bytes(), suffix.as_bytes());
    id.len() >= suffix.len() && id[id.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_filter() -> CandidateFilter {
        CandidateFilter::new(".pdf", Marker::Prefix("processed-".into()))
    }

    fn bucket_filter() -> CandidateFilter {
        CandidateFilter::new(".pdf", Marker::Suffix(".processed".into()))
    }

    #[test]
    fn prefix_marker_excludes_processed_files() {
        let f = folder_filter();
        assert!(f.is_candidate("a.pdf"));
        assert!(!f.is_candidate("processed-c.pdf"));
        assert!(!f.is_candidate("notes.txt"));
    }

    #[test]
    fn suffix_match_is_case_insensitive() {
        let f = folder_filter();
        assert!(f.is_candidate("SCAN.PDF"));
        assert!(!f.is_candidate("pdf"));
    }

    #[test]
    fn suffix_marker_excludes_processed_keys() {
        let f = bucket_filter();
        assert!(f.is_candidate("a.pdf"));
        assert!(!f.is_candidate("a.pdf.processed"));
    }

    #[test]
    fn prefix_marker_applies_to_basename() {
        let m = Marker::Prefix("processed-".into());
        assert_eq!(m.apply("a.pdf"), "processed-a.pdf");
        assert_eq!(m.apply("in/a.pdf"), "in/processed-a.pdf");
        assert!(m.is_marked("in/processed-a.pdf"));
        assert!(!m.is_marked("processed/a.pdf"));
    }

    #[test]
    fn applied_marker_is_never_a_candidate() {
        for f in [folder_filter(), bucket_filter()] {
            let marked = f.marker().apply("doc.pdf");
            assert!(!f.is_candidate(&marked), "{marked} listed again");
        }
    }
}
