//! Commit-driven reconciliation: replays repository commits against the catalog.

use msync_domain::{
    merge_fragments, ChangeSet, CommitResult, ManifestFragment, MinManifestInfo, UpdateBatchResult,
    UpdateRequest,
};
use reqwest::Client;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::catalog::{CatalogClient, DeleteOutcome};
use crate::config::Settings;
use crate::error::SyncError;
use crate::net::{build_http_client, download_string};
use crate::source::{GitHubSourceTree, SourceTree};

/// What reconciling one directory did to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    Upserted { package_id: String, version: String },
    Deleted { package_id: String },
    /// Nothing was written; the reason has already been logged.
    Skipped,
}

impl DirectoryOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

pub struct CommitReconciler<'a, S> {
    source: &'a S,
    catalog: &'a CatalogClient,
    http: &'a Client,
}

impl<'a, S: SourceTree> CommitReconciler<'a, S> {
    pub fn new(source: &'a S, catalog: &'a CatalogClient, http: &'a Client) -> Self {
        Self {
            source,
            catalog,
            http,
        }
    }

    /// Processes `commits` in order. One entry per commit is always recorded, and a failing
    /// commit never stops the ones after it.
    pub async fn reconcile_commits(&self, commits: &[String]) -> UpdateBatchResult {
        let mut batch = UpdateBatchResult::success();
        for commit_id in commits {
            let result = match self.reconcile_commit(commit_id).await {
                Ok(result) => result,
                Err(err) => {
                    error!(commit = %commit_id, kind = err.kind(), error = %err, "commit failed");
                    CommitResult::failure_with(commit_id, err.to_string())
                }
            };
            info!(commit = %commit_id, result = %result.result(), "commit processed");
            batch.add_commit_result(result);
        }
        batch
    }

    /// Succeeds when at least one touched directory was written or deleted.
    pub async fn reconcile_commit(&self, commit_id: &str) -> Result<CommitResult, SyncError> {
        let commit = self.source.commit(commit_id).await?;
        let changes = ChangeSet::extract(&commit.files);
        debug!(
            commit = commit_id,
            files = commit.files.len(),
            directories = changes.len(),
            "extracted change set"
        );

        let mut succeeded = 0usize;
        for entry in changes.entries() {
            let outcome = self
                .reconcile_directory(commit_id, &entry.directory_path, &entry.deleted_file_urls)
                .await?;
            if outcome.succeeded() {
                succeeded += 1;
            }
        }

        if succeeded > 0 {
            Ok(CommitResult::success(commit_id))
        } else {
            Ok(CommitResult::failure(commit_id))
        }
    }

    /// Brings the catalog in line with one directory as of `commit_id`.
    ///
    /// Merge and catalog failures skip the directory. Errors returned from here come from
    /// reading the source tree itself and fail the whole commit.
    pub async fn reconcile_directory(
        &self,
        commit_id: &str,
        directory: &str,
        deleted_urls: &[String],
    ) -> Result<DirectoryOutcome, SyncError> {
        let listing = match self.source.list_directory(directory, commit_id).await {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => {
                debug!(directory, "directory no longer exists");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        if listing.is_empty() {
            return Ok(self.delete_from_removed(directory, deleted_urls).await);
        }

        let mut fragments = Vec::with_capacity(listing.len());
        for entry in &listing {
            let content = self.source.file_content(&entry.path, commit_id).await?;
            fragments.push(ManifestFragment::new(entry.name.clone(), content));
        }

        let manifest = match merge_fragments(&fragments) {
            Ok(manifest) => manifest,
            Err(source) => {
                let err = SyncError::Merge {
                    path: directory.to_string(),
                    source,
                };
                error!(directory, kind = err.kind(), error = %err, "skipping directory");
                return Ok(DirectoryOutcome::Skipped);
            }
        };

        match self.catalog.add_or_update(&manifest).await {
            Ok(outcome) => {
                info!(
                    directory,
                    package = manifest.id(),
                    version = manifest.version(),
                    replaced = outcome.prior_content,
                    "directory reconciled"
                );
                Ok(DirectoryOutcome::Upserted {
                    package_id: manifest.id().to_string(),
                    version: manifest.version().to_string(),
                })
            }
            Err(err) => {
                error!(
                    directory,
                    package = manifest.id(),
                    kind = err.kind(),
                    error = %err,
                    "skipping directory"
                );
                Ok(DirectoryOutcome::Skipped)
            }
        }
    }

    /// The directory is gone: identify its package from the first removed file that can
    /// still be downloaded and delete the package record. Stops after the first success.
    async fn delete_from_removed(
        &self,
        directory: &str,
        deleted_urls: &[String],
    ) -> DirectoryOutcome {
        if deleted_urls.is_empty() {
            warn!(directory, "directory is empty but no removed manifests were recorded");
            return DirectoryOutcome::Skipped;
        }
        for url in deleted_urls {
            if url.is_empty() {
                continue;
            }
            let content = match download_string(self.http, url).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(
                        directory,
                        kind = err.kind(),
                        error = %err,
                        "removed manifest unavailable"
                    );
                    continue;
                }
            };
            let info = match MinManifestInfo::from_yaml(&content) {
                Ok(info) => info,
                Err(err) => {
                    warn!(directory, error = %err, "removed manifest is unreadable");
                    continue;
                }
            };
            match self.catalog.delete_package(&info.id).await {
                Ok(DeleteOutcome::Deleted | DeleteOutcome::AlreadyAbsent) => {
                    info!(directory, package = %info.id, "package removed from catalog");
                    return DirectoryOutcome::Deleted {
                        package_id: info.id,
                    };
                }
                Err(err) => {
                    warn!(
                        directory,
                        package = %info.id,
                        kind = err.kind(),
                        error = %err,
                        "catalog delete failed"
                    );
                }
            }
        }
        DirectoryOutcome::Skipped
    }
}

/// Entry point for an update request. Setup problems yield an `Error` batch with no
/// commit entries; otherwise the batch is `Success` and carries one entry per commit.
pub async fn process_update_request(
    settings: &Settings,
    request: &UpdateRequest,
) -> UpdateBatchResult {
    let span = info_span!("update", operation_id = %request.operation_id);
    async move {
        info!(%request, "processing update request");
        if let Err(err) = request.validate() {
            error!(error = %err, "update request rejected");
            return UpdateBatchResult::error();
        }
        let (http, source, catalog) = match update_components(settings) {
            Ok(components) => components,
            Err(err) => {
                error!(kind = err.kind(), error = %err, "update aborted during setup");
                return UpdateBatchResult::error();
            }
        };
        let batch = CommitReconciler::new(&source, &catalog, &http)
            .reconcile_commits(&request.commits)
            .await;
        info!(
            commits = batch.commit_results().len(),
            succeeded = batch.succeeded_commits(),
            "update request finished"
        );
        batch
    }
    .instrument(span)
    .await
}

fn update_components(
    settings: &Settings,
) -> Result<(Client, GitHubSourceTree, CatalogClient), SyncError> {
    let http = build_http_client(settings.network())?;
    let source = GitHubSourceTree::new(http.clone(), settings.github())?;
    let catalog = CatalogClient::new(http.clone(), settings.catalog())?;
    Ok((http, source, catalog))
}
