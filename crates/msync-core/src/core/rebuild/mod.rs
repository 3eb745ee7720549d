//! Full catalog rebuild from an index snapshot.
//!
//! The snapshot is downloaded to a temporary file, every manifest row is resolved to its
//! repository path, and the cached manifest document at that path is upserted into the
//! catalog. A row that cannot be fetched, parsed or written is skipped; a snapshot that
//! cannot be read aborts the rebuild.

mod snapshot;

pub use snapshot::load_index;

use msync_domain::{IndexTree, Manifest, RebuildBatchResult, RebuildRequest};
use reqwest::Client;
use tracing::{error, info, info_span, warn, Instrument};

use crate::catalog::CatalogClient;
use crate::config::{ManifestCacheConfig, Settings};
use crate::error::SyncError;
use crate::net::{build_http_client, download_string, download_to_temp};

/// Read-only store of manifest documents keyed by repository path.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    http: Client,
    endpoint: String,
}

impl ManifestCache {
    pub fn new(http: Client, config: &ManifestCacheConfig) -> Result<Self, SyncError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            SyncError::FatalSetup("manifest cache endpoint is not configured".to_string())
        })?;
        Ok(Self { http, endpoint })
    }

    /// Joins the endpoint and `relative_path` with exactly one `/`.
    #[must_use]
    pub fn document_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }

    pub async fn fetch(&self, relative_path: &str) -> Result<String, SyncError> {
        download_string(&self.http, &self.document_url(relative_path)).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
}

pub struct IndexWalker<'a> {
    catalog: &'a CatalogClient,
    cache: &'a ManifestCache,
}

impl<'a> IndexWalker<'a> {
    pub fn new(catalog: &'a CatalogClient, cache: &'a ManifestCache) -> Self {
        Self { catalog, cache }
    }

    /// Upserts every manifest row of `tree`, one at a time.
    ///
    /// Index inconsistencies (unknown name or path ids, cyclic paths) abort the walk.
    pub async fn walk(&self, tree: &IndexTree) -> Result<RebuildSummary, SyncError> {
        let mut resolver = tree.resolver();
        let mut summary = RebuildSummary::default();
        for row in tree.manifests() {
            summary.processed += 1;
            let name = tree.name(row.name_id)?;
            let path = resolver.resolve(row.path_part_id)?;

            let document = match self.cache.fetch(&path).await {
                Ok(document) => document,
                Err(err) => {
                    error!(
                        package = name,
                        path = %path,
                        kind = err.kind(),
                        error = %err,
                        "skipping manifest"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };
            let manifest = match Manifest::from_yaml(&document) {
                Ok(manifest) => manifest,
                Err(err) => {
                    error!(
                        package = name,
                        path = %path,
                        error = %err,
                        "skipping unparseable manifest"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };
            if manifest.id() != name {
                warn!(
                    package = name,
                    manifest_id = manifest.id(),
                    "index name differs from manifest identifier"
                );
            }
            match self.catalog.add_or_update(&manifest).await {
                Ok(_) => summary.updated += 1,
                Err(err) => {
                    error!(
                        package = name,
                        path = %path,
                        kind = err.kind(),
                        error = %err,
                        "skipping manifest"
                    );
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }
}

/// Entry point for a rebuild request. Any failure outside the per-row loop yields an
/// `Error` result.
pub async fn process_rebuild_request(
    settings: &Settings,
    request: &RebuildRequest,
) -> RebuildBatchResult {
    let span = info_span!("rebuild", operation_id = %request.operation_id);
    async move {
        info!(%request, "processing rebuild request");
        match rebuild(settings, request).await {
            Ok(summary) => {
                info!(
                    processed = summary.processed,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    "rebuild finished"
                );
                RebuildBatchResult::success()
            }
            Err(err) => {
                error!(kind = err.kind(), error = %err, "rebuild failed");
                RebuildBatchResult::error()
            }
        }
    }
    .instrument(span)
    .await
}

async fn rebuild(
    settings: &Settings,
    request: &RebuildRequest,
) -> Result<RebuildSummary, SyncError> {
    request.validate()?;
    let http = build_http_client(settings.network())?;
    let catalog = CatalogClient::new(http.clone(), settings.catalog())?;
    let cache = ManifestCache::new(http.clone(), settings.manifest_cache())?;

    // The reference is a pre-signed URL; it is never logged.
    let snapshot = download_to_temp(&http, &request.reference)
        .await
        .map_err(|err| match err {
            SyncError::TransientFetch { reason, .. } => SyncError::TransientFetch {
                url: "<index snapshot>".to_string(),
                reason,
            },
            other => other,
        })?;
    let tree = load_index(snapshot.path())?;
    IndexWalker::new(&catalog, &cache).walk(&tree).await
}
