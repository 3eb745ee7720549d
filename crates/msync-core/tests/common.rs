#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use httptest::Server;
use msync_core::{
    build_http_client, CatalogClient, CatalogConfig, Commit, NetworkConfig, RepositoryEntry,
    SourceTree, SyncError,
};
use msync_domain::{parent_directory, FileChange};
use reqwest::{Client, StatusCode};

pub const CATALOG_PATH: &str = "/api/packageManifests";
pub const FUNCTION_KEY: &str = "test-function-key";

pub const SINGLETON: &str = "\
PackageIdentifier: Contoso.Tool
PackageVersion: 1.2.0
PackageName: Contoso Tool
Publisher: Contoso
License: MIT
ShortDescription: A tool
Installers:
  - Architecture: x64
    InstallerType: msi
    InstallerUrl: https://contoso.example/tool.msi
    InstallerSha256: ABCDEF
ManifestType: singleton
ManifestVersion: 1.0.0
";

pub const VERSION_FILE: &str = "\
PackageIdentifier: Fabrikam.App
PackageVersion: '3.1.0'
DefaultLocale: en-US
ManifestType: version
ManifestVersion: 1.4.0
";

pub const INSTALLER_FILE: &str = "\
PackageIdentifier: Fabrikam.App
PackageVersion: '3.1.0'
InstallerType: exe
Installers:
  - Architecture: x64
    InstallerUrl: https://fabrikam.example/app.exe
    InstallerSha256: 012345
ManifestType: installer
ManifestVersion: 1.4.0
";

pub const DEFAULT_LOCALE_FILE: &str = "\
PackageIdentifier: Fabrikam.App
PackageVersion: '3.1.0'
PackageLocale: en-US
Publisher: Fabrikam
PackageName: App
License: Proprietary
ShortDescription: Fabrikam app
ManifestType: defaultLocale
ManifestVersion: 1.4.0
";

/// In-memory repository: commit file lists plus file contents keyed by path.
#[derive(Debug, Default)]
pub struct FakeSourceTree {
    commits: HashMap<String, Vec<FileChange>>,
    files: HashMap<String, String>,
    broken_listings: HashSet<String>,
}

impl FakeSourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, commit_id: &str, files: Vec<FileChange>) -> Self {
        self.commits.insert(commit_id.to_string(), files);
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Listing `directory` fails with a server error instead of returning entries.
    pub fn with_broken_listing(mut self, directory: &str) -> Self {
        self.broken_listings.insert(directory.to_string());
        self
    }
}

impl SourceTree for FakeSourceTree {
    async fn commit(&self, commit_id: &str) -> Result<Commit, SyncError> {
        self.commits
            .get(commit_id)
            .map(|files| Commit {
                sha: commit_id.to_string(),
                files: files.clone(),
            })
            .ok_or_else(|| SyncError::NotFound {
                resource: format!("commit '{commit_id}'"),
            })
    }

    async fn list_directory(
        &self,
        path: &str,
        _commit_id: &str,
    ) -> Result<Vec<RepositoryEntry>, SyncError> {
        if self.broken_listings.contains(path) {
            return Err(SyncError::Source {
                resource: format!("directory '{path}'"),
                status: StatusCode::BAD_GATEWAY,
            });
        }
        let mut entries: Vec<_> = self
            .files
            .keys()
            .filter(|file| parent_directory(file) == path)
            .map(|file| {
                let name = file.rsplit('/').next().unwrap_or(file);
                RepositoryEntry::file(name, file.clone())
            })
            .collect();
        if entries.is_empty() {
            return Err(SyncError::NotFound {
                resource: format!("directory '{path}'"),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn file_content(&self, path: &str, _commit_id: &str) -> Result<String, SyncError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                resource: format!("file '{path}'"),
            })
    }
}

pub fn http_client() -> Client {
    build_http_client(&NetworkConfig {
        timeout: Duration::from_secs(5),
        keep_proxies: false,
    })
    .expect("http client")
}

pub fn catalog_for(server: &Server, http: &Client) -> CatalogClient {
    CatalogClient::new(
        http.clone(),
        &CatalogConfig {
            endpoint: Some(server.url_str(CATALOG_PATH)),
            function_key: Some(FUNCTION_KEY.to_string()),
        },
    )
    .expect("catalog client")
}

pub fn package_path(id: &str) -> String {
    format!("{CATALOG_PATH}/{id}/")
}
