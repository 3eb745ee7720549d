use std::fmt::Display;

use msync_domain::{IndexError, ManifestError, MergeError, RequestError};
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("catalog lookup for '{id}' failed with status {status}")]
    Lookup { id: String, status: StatusCode },
    #[error("catalog rejected write for '{id}' with a conflict")]
    UpdateConflict { id: String },
    #[error("catalog write for '{id}' failed with status {status}")]
    Update { id: String, status: StatusCode },
    #[error("catalog delete for '{id}' failed with status {status}")]
    Delete { id: String, status: StatusCode },
    #[error("unable to merge manifests in '{path}': {source}")]
    Merge {
        path: String,
        #[source]
        source: MergeError,
    },
    #[error("failed to fetch {url}: {reason}")]
    TransientFetch { url: String, reason: String },
    #[error("{0}")]
    FatalSetup(String),
    #[error("source tree has no {resource}")]
    NotFound { resource: String },
    #[error("source tree request for {resource} failed with status {status}")]
    Source { resource: String, status: StatusCode },
    #[error("unexpected response payload from {origin}: {reason}")]
    Payload { origin: String, reason: String },
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("index snapshot could not be read: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub(crate) fn transient(url: &str, reason: impl Display) -> Self {
        Self::TransientFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn payload(origin: impl Into<String>, reason: impl Display) -> Self {
        Self::Payload {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Stable short label used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup { .. } => "lookup",
            Self::UpdateConflict { .. } => "update_conflict",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Merge { .. } => "merge",
            Self::TransientFetch { .. } => "transient_fetch",
            Self::FatalSetup(_) => "fatal_setup",
            Self::NotFound { .. } => "not_found",
            Self::Source { .. } => "source",
            Self::Payload { .. } => "payload",
            Self::Request(_) => "request",
            Self::Manifest(_) => "manifest",
            Self::Index(_) => "index",
            Self::Http(_) => "http",
            Self::Sqlite(_) => "sqlite",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        let missing = SyncError::NotFound {
            resource: "directory 'manifests/a'".into(),
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.kind(), "not_found");
        let failed = SyncError::Source {
            resource: "directory 'manifests/a'".into(),
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(!failed.is_not_found());
    }

    #[test]
    fn merge_error_keeps_diagnostics() {
        let err = SyncError::Merge {
            path: "manifests/p/a/1.0".into(),
            source: MergeError {
                diagnostics: vec!["missing installer manifest".into()],
            },
        };
        let rendered = err.to_string();
        assert!(rendered.contains("manifests/p/a/1.0"), "{rendered}");
        assert!(rendered.contains("missing installer manifest"), "{rendered}");
    }
}
