//! Per-commit and per-batch outcomes returned to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceResultType {
    Success,
    Failure,
    /// Kept for wire compatibility with existing consumers; never produced here.
    FailureNoRetry,
    Error,
}

impl fmt::Display for SourceResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::FailureNoRetry => "FailureNoRetry",
            Self::Error => "Error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    #[serde(rename = "Commit")]
    commit_id: String,
    #[serde(rename = "Result")]
    result: SourceResultType,
    #[serde(rename = "Metadata", default)]
    metadata: String,
}

impl CommitResult {
    pub fn success(commit_id: impl Into<String>) -> Self {
        Self::new(commit_id, SourceResultType::Success, String::new())
    }

    pub fn failure(commit_id: impl Into<String>) -> Self {
        Self::new(commit_id, SourceResultType::Failure, String::new())
    }

    pub fn failure_with(commit_id: impl Into<String>, metadata: impl Into<String>) -> Self {
        Self::new(commit_id, SourceResultType::Failure, metadata)
    }

    pub fn new(
        commit_id: impl Into<String>,
        result: SourceResultType,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            commit_id: commit_id.into(),
            result,
            metadata: metadata.into(),
        }
    }

    #[must_use]
    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    #[must_use]
    pub fn result(&self) -> SourceResultType {
        self.result
    }

    #[must_use]
    pub fn metadata(&self) -> &str {
        &self.metadata
    }
}

impl fmt::Display for CommitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Commit: '{}' Result: '{}' Metadata: '{}'",
            self.commit_id, self.result, self.metadata
        )
    }
}

/// Outcome of an update batch: overall status plus one entry per requested commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatchResult {
    #[serde(rename = "OverallResult")]
    overall_result: SourceResultType,
    #[serde(rename = "CommitResults", default)]
    commit_results: Vec<CommitResult>,
}

impl UpdateBatchResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            overall_result: SourceResultType::Success,
            commit_results: Vec::new(),
        }
    }

    /// A batch that aborted before any commit could be processed.
    #[must_use]
    pub fn error() -> Self {
        Self {
            overall_result: SourceResultType::Error,
            commit_results: Vec::new(),
        }
    }

    pub fn add_commit_result(&mut self, result: CommitResult) {
        self.commit_results.push(result);
    }

    #[must_use]
    pub fn overall_result(&self) -> SourceResultType {
        self.overall_result
    }

    #[must_use]
    pub fn commit_results(&self) -> &[CommitResult] {
        &self.commit_results
    }

    #[must_use]
    pub fn succeeded_commits(&self) -> usize {
        self.commit_results
            .iter()
            .filter(|result| result.result == SourceResultType::Success)
            .count()
    }
}

impl fmt::Display for UpdateBatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let commits = self
            .commit_results
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "OverallResult: '{}' CommitResults: '{commits}'",
            self.overall_result
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildBatchResult {
    #[serde(rename = "OverallResult")]
    overall_result: SourceResultType,
}

impl RebuildBatchResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            overall_result: SourceResultType::Success,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            overall_result: SourceResultType::Error,
        }
    }

    #[must_use]
    pub fn overall_result(&self) -> SourceResultType {
        self.overall_result
    }
}

impl fmt::Display for RebuildBatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OverallResult: '{}'", self.overall_result)
    }
}
