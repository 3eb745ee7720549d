#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod core;

pub(crate) use crate::core::{catalog, config, error, net, source};

pub use crate::core::catalog::{CatalogClient, DeleteOutcome, ExistingRecord, UpsertOutcome};
pub use crate::core::config::{
    CatalogConfig, EnvSnapshot, GitHubConfig, ManifestCacheConfig, NetworkConfig, Settings,
};
pub use crate::core::error::SyncError;
pub use crate::core::net::{build_http_client, FUNCTION_KEY_HEADER};
pub use crate::core::rebuild::{
    load_index, process_rebuild_request, IndexWalker, ManifestCache, RebuildSummary,
};
pub use crate::core::source::{Commit, GitHubSourceTree, RepositoryEntry, SourceTree};
pub use crate::core::update::{process_update_request, CommitReconciler, DirectoryOutcome};

pub mod env {
    pub use crate::core::config::{
        ENV_CATALOG_ENDPOINT, ENV_FUNCTION_KEY, ENV_GITHUB_API, ENV_GITHUB_REPOSITORY,
        ENV_GITHUB_TOKEN, ENV_HTTP_TIMEOUT_SECS, ENV_KEEP_PROXIES, ENV_MANIFEST_CACHE_ENDPOINT,
    };
}
