use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use super::{Commit, RepositoryEntry, SourceTree};
use crate::config::GitHubConfig;
use crate::error::SyncError;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// [`SourceTree`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubSourceTree {
    http: Client,
    api_base: Url,
    owner: String,
    repo: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

impl GitHubSourceTree {
    /// Requires `repository` in `owner/name` form.
    pub fn new(http: Client, config: &GitHubConfig) -> Result<Self, SyncError> {
        let repository = config.repository.as_deref().ok_or_else(|| {
            SyncError::FatalSetup("source repository is not configured".to_string())
        })?;
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| {
                SyncError::FatalSetup(format!(
                    "source repository '{repository}' must look like owner/name"
                ))
            })?;
        let api_base = Url::parse(&config.api_base).map_err(|err| {
            SyncError::FatalSetup(format!("invalid API base '{}': {err}", config.api_base))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(SyncError::FatalSetup(format!(
                "invalid API base '{}'",
                config.api_base
            )));
        }
        Ok(Self {
            http,
            api_base,
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: config.token.clone(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/{section}/{path...}` with every segment escaped.
    fn repo_url(&self, section: &str, path: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), section])
                .extend(path.split(['/', '\\']).filter(|part| !part.is_empty()));
        }
        url
    }

    async fn get(&self, url: Url, resource: String) -> Result<JsonValue, SyncError> {
        debug!(%url, "source tree request");
        let mut request = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(SyncError::NotFound { resource });
        }
        if !status.is_success() {
            return Err(SyncError::Source { resource, status });
        }
        response
            .json::<JsonValue>()
            .await
            .map_err(|err| SyncError::payload(url.as_str(), err))
    }

    async fn contents(
        &self,
        path: &str,
        commit_id: &str,
        resource: String,
    ) -> Result<JsonValue, SyncError> {
        let mut url = self.repo_url("contents", path);
        url.query_pairs_mut().append_pair("ref", commit_id);
        self.get(url, resource).await
    }
}

impl SourceTree for GitHubSourceTree {
    async fn commit(&self, commit_id: &str) -> Result<Commit, SyncError> {
        let url = self.repo_url("commits", commit_id);
        let origin = url.to_string();
        let body = self.get(url, format!("commit '{commit_id}'")).await?;
        serde_json::from_value(body).map_err(|err| SyncError::payload(origin, err))
    }

    async fn list_directory(
        &self,
        path: &str,
        commit_id: &str,
    ) -> Result<Vec<RepositoryEntry>, SyncError> {
        let body = self
            .contents(path, commit_id, format!("directory '{path}'"))
            .await?;
        let entries: Vec<RepositoryEntry> = match body {
            JsonValue::Array(_) => serde_json::from_value(body)
                .map_err(|err| SyncError::payload(path, err))?,
            _ => {
                return Err(SyncError::payload(
                    path,
                    "expected a directory listing but found a single entry",
                ))
            }
        };
        Ok(entries.into_iter().filter(RepositoryEntry::is_file).collect())
    }

    async fn file_content(&self, path: &str, commit_id: &str) -> Result<String, SyncError> {
        let body = self
            .contents(path, commit_id, format!("file '{path}'"))
            .await?;
        let file: FileContent =
            serde_json::from_value(body).map_err(|err| SyncError::payload(path, err))?;
        if file.encoding != "base64" {
            return Err(SyncError::payload(
                path,
                format!("unsupported content encoding '{}'", file.encoding),
            ));
        }
        let packed: String = file.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(packed)
            .map_err(|err| SyncError::payload(path, err))?;
        String::from_utf8(bytes).map_err(|err| SyncError::payload(path, err))
    }
}
