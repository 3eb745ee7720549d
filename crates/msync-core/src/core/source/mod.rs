//! Read access to the manifest repository at a given commit.

mod github;

pub use github::GitHubSourceTree;

use msync_domain::FileChange;
use serde::Deserialize;

use crate::error::SyncError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
}

impl RepositoryEntry {
    #[must_use]
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: default_entry_kind(),
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

fn default_entry_kind() -> String {
    "file".to_string()
}

/// Operations the reconciler needs from the repository host.
///
/// Implementations report a missing commit, directory or file as
/// [`SyncError::NotFound`] so callers can tell deletion apart from failure.
#[allow(async_fn_in_trait)]
pub trait SourceTree {
    async fn commit(&self, commit_id: &str) -> Result<Commit, SyncError>;

    /// Files directly inside `path` as of `commit_id`.
    async fn list_directory(
        &self,
        path: &str,
        commit_id: &str,
    ) -> Result<Vec<RepositoryEntry>, SyncError>;

    async fn file_content(&self, path: &str, commit_id: &str) -> Result<String, SyncError>;
}
