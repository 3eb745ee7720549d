//! Client for the package catalog service.
//!
//! Records are addressed as `{endpoint}/{package id}/` and authenticated with the
//! function key header. Writes are read-merge-write: the stored record is fetched,
//! the new manifest is folded into it, then the whole record is sent back.

use msync_domain::{add_manifest_to_package_manifest, Manifest, PackageManifest};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::config::CatalogConfig;
use crate::error::SyncError;
use crate::net::FUNCTION_KEY_HEADER;

const DATA_FIELD: &str = "Data";

/// What the catalog held for a package before a write.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistingRecord {
    Absent,
    /// A record exists; the payload is its `Data` field, or null when the body was empty.
    Present(JsonValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub package: PackageManifest,
    /// True when the write replaced an existing record (PUT) rather than creating one (POST).
    pub prior_content: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    endpoint: String,
    function_key: String,
}

impl CatalogClient {
    /// Requires both the catalog endpoint and its function key.
    pub fn new(http: Client, config: &CatalogConfig) -> Result<Self, SyncError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            SyncError::FatalSetup("catalog endpoint is not configured".to_string())
        })?;
        let function_key = config.function_key.clone().ok_or_else(|| {
            SyncError::FatalSetup("catalog function key is not configured".to_string())
        })?;
        Ok(Self {
            http,
            endpoint,
            function_key,
        })
    }

    #[must_use]
    pub fn package_url(&self, package_id: &str) -> String {
        format!("{}/{package_id}/", self.endpoint.trim_end_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(FUNCTION_KEY_HEADER, &self.function_key)
    }

    /// Fetches the stored record. 204 and 404 both mean no record exists.
    pub async fn lookup(&self, package_id: &str) -> Result<ExistingRecord, SyncError> {
        let url = self.package_url(package_id);
        let response = self.request(Method::GET, &url).send().await?;
        let status = response.status();
        if matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            debug!(package = package_id, %status, "no existing catalog record");
            return Ok(ExistingRecord::Absent);
        }
        if !status.is_success() {
            return Err(SyncError::Lookup {
                id: package_id.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(ExistingRecord::Present(JsonValue::Null));
        }
        let mut envelope: JsonValue =
            serde_json::from_str(&body).map_err(|err| SyncError::payload(url.clone(), err))?;
        let data = envelope
            .get_mut(DATA_FIELD)
            .map(JsonValue::take)
            .ok_or_else(|| SyncError::payload(url, "record has no Data field"))?;
        Ok(ExistingRecord::Present(data))
    }

    /// Creates or replaces the catalog record for `manifest`'s package.
    ///
    /// Running this twice with the same manifest leaves the catalog unchanged after the
    /// first call; the second call replaces the version entry with an identical one.
    pub async fn add_or_update(&self, manifest: &Manifest) -> Result<UpsertOutcome, SyncError> {
        let package_id = manifest.id();
        let existing = self.lookup(package_id).await?;
        let (prior, prior_content) = match &existing {
            ExistingRecord::Absent => (None, false),
            ExistingRecord::Present(data) => (Some(data), true),
        };
        let package = add_manifest_to_package_manifest(manifest, prior)?;
        let body = serde_json::to_string(&package)
            .map_err(|err| SyncError::payload(package_id, err))?;

        let (method, url) = if prior_content {
            (Method::PUT, self.package_url(package_id))
        } else {
            (Method::POST, self.endpoint.clone())
        };
        let response = self
            .request(method.clone(), &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::CONFLICT {
            error!(
                package = package_id,
                version = manifest.version(),
                %method,
                prior_content,
                "catalog reported a conflicting write"
            );
            return Err(SyncError::UpdateConflict {
                id: package_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SyncError::Update {
                id: package_id.to_string(),
                status,
            });
        }
        info!(
            package = package_id,
            version = manifest.version(),
            %method,
            "catalog record written"
        );
        Ok(UpsertOutcome {
            package,
            prior_content,
        })
    }

    /// Deletes the whole record for `package_id`. A missing record is not an error.
    pub async fn delete_package(&self, package_id: &str) -> Result<DeleteOutcome, SyncError> {
        let url = self.package_url(package_id);
        let response = self.request(Method::DELETE, &url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(package = package_id, "catalog record already absent");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        if !status.is_success() {
            return Err(SyncError::Delete {
                id: package_id.to_string(),
                status,
            });
        }
        info!(package = package_id, "catalog record deleted");
        Ok(DeleteOutcome::Deleted)
    }
}
