//! Grouping of a commit's file list into the directories it touched.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Extension (without the dot) of files that contribute to a manifest.
pub const MANIFEST_EXTENSION: &str = "yaml";

/// Status reported by the source tree for one file in a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    #[serde(rename = "filename")]
    pub file_path: String,
    pub status: FileStatus,
    #[serde(rename = "raw_url", default)]
    pub raw_content_url: String,
}

impl FileChange {
    pub fn new(
        file_path: impl Into<String>,
        status: FileStatus,
        raw_content_url: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            status,
            raw_content_url: raw_content_url.into(),
        }
    }
}

/// A directory touched by a commit, plus the raw URLs of manifest files removed from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSetEntry {
    pub directory_path: String,
    pub deleted_file_urls: Vec<String>,
}

/// The directories touched by a single commit, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    /// Builds the change set for a commit's file list.
    ///
    /// Files without the manifest extension are ignored. Every remaining file registers its
    /// parent directory; removed files additionally record their raw content URL so the
    /// package they belonged to can still be identified after the directory is gone.
    pub fn extract(files: &[FileChange]) -> Self {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<ChangeSetEntry> = Vec::new();
        for file in files {
            if !has_manifest_extension(&file.file_path) {
                tracing::debug!(path = %file.file_path, "skipping non-manifest file");
                continue;
            }
            let directory = parent_directory(&file.file_path);
            let position = *positions.entry(directory).or_insert_with(|| {
                entries.push(ChangeSetEntry {
                    directory_path: directory.to_string(),
                    deleted_file_urls: Vec::new(),
                });
                entries.len() - 1
            });
            if file.status == FileStatus::Removed {
                entries[position]
                    .deleted_file_urls
                    .push(file.raw_content_url.clone());
            }
        }
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ChangeSetEntry] {
        &self.entries
    }
}

/// Case-insensitive check for the manifest extension.
#[must_use]
pub fn has_manifest_extension(path: &str) -> bool {
    let name = file_name(path);
    name.rfind('.')
        .is_some_and(|idx| name[idx + 1..].eq_ignore_ascii_case(MANIFEST_EXTENSION))
}

/// Everything before the last path separator; empty for top-level files.
#[must_use]
pub fn parent_directory(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or("", |idx| &path[..idx])
}

fn file_name(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or(path, |idx| &path[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, status: FileStatus) -> FileChange {
        FileChange::new(path, status, format!("https://raw.example/{path}"))
    }

    fn deleted_urls<'a>(set: &'a ChangeSet, directory: &str) -> Option<&'a [String]> {
        set.entries()
            .iter()
            .find(|entry| entry.directory_path == directory)
            .map(|entry| entry.deleted_file_urls.as_slice())
    }

    #[test]
    fn non_manifest_files_never_produce_entries() {
        let files = vec![
            change("docs/README.md", FileStatus::Added),
            change("manifests/Foo/notes.txt", FileStatus::Removed),
            change("manifests/Foo/yaml", FileStatus::Modified),
        ];
        let set = ChangeSet::extract(&files);
        assert!(set.is_empty());
    }

    #[test]
    fn groups_by_parent_directory() {
        let files = vec![
            change("manifests/Foo/1.0/Foo.yaml", FileStatus::Added),
            change("manifests/Foo/1.0/Foo.installer.YAML", FileStatus::Modified),
            change("manifests/Bar/2.0/Bar.yaml", FileStatus::Added),
        ];
        let set = ChangeSet::extract(&files);
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries()[0].directory_path, "manifests/Foo/1.0");
        assert_eq!(set.entries()[1].directory_path, "manifests/Bar/2.0");
        assert_eq!(deleted_urls(&set, "manifests/Foo/1.0"), Some(&[][..]));
        assert_eq!(deleted_urls(&set, "manifests/Bar/2.0"), Some(&[][..]));
    }

    #[test]
    fn removed_files_record_raw_urls_in_order() {
        let files = vec![
            change("manifests/Foo/Foo.yaml", FileStatus::Removed),
            change("manifests/Foo/Foo.locale.en-US.yaml", FileStatus::Modified),
            change("manifests/Foo/Foo.installer.yaml", FileStatus::Removed),
        ];
        let set = ChangeSet::extract(&files);
        assert_eq!(
            deleted_urls(&set, "manifests/Foo").unwrap(),
            &[
                "https://raw.example/manifests/Foo/Foo.yaml".to_string(),
                "https://raw.example/manifests/Foo/Foo.installer.yaml".to_string(),
            ][..]
        );
    }

    #[test]
    fn top_level_manifest_maps_to_empty_directory() {
        let set = ChangeSet::extract(&[change("Foo.yaml", FileStatus::Added)]);
        assert_eq!(deleted_urls(&set, ""), Some(&[][..]));
    }

    #[test]
    fn bare_extension_file_counts_as_manifest() {
        assert!(has_manifest_extension("manifests/Foo/.yaml"));
        let set = ChangeSet::extract(&[change("manifests/Foo/.yaml", FileStatus::Removed)]);
        assert_eq!(
            deleted_urls(&set, "manifests/Foo").unwrap(),
            &["https://raw.example/manifests/Foo/.yaml".to_string()][..]
        );
    }

    #[test]
    fn unknown_status_deserializes() {
        let change: FileChange = serde_json::from_str(
            r#"{"filename":"a/b.yaml","status":"weird","raw_url":"https://x"}"#,
        )
        .unwrap();
        assert_eq!(change.status, FileStatus::Unknown);
        assert_eq!(parent_directory(&change.file_path), "a");
    }
}
