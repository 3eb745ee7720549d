use std::io::Write;

use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::{EnvSnapshot, NetworkConfig, ENV_KEEP_PROXIES};
use crate::error::SyncError;

pub(crate) const MSYNC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the catalog function key on every catalog request.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

const PROXY_KEYS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Decide whether outbound clients should honor standard proxy environment variables.
///
/// Behavior:
/// - `MSYNC_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `MSYNC_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are enabled only when at least one proxy env var is set.
pub(crate) fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    match snapshot.var(ENV_KEEP_PROXIES) {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        None => PROXY_KEYS
            .iter()
            .any(|key| snapshot.non_empty(key).is_some()),
    }
}

/// Shared client for every outbound call; the timeout bounds each request.
pub fn build_http_client(network: &NetworkConfig) -> Result<Client, SyncError> {
    let builder = Client::builder()
        .user_agent(format!("msync/{MSYNC_VERSION}"))
        .timeout(network.timeout);
    let builder = if network.keep_proxies {
        builder
    } else {
        builder.no_proxy()
    };
    builder
        .build()
        .map_err(|err| SyncError::FatalSetup(format!("failed to build HTTP client: {err}")))
}

/// GET `url` and return the body as text. Any transport failure or non-success status
/// is reported as [`SyncError::TransientFetch`].
pub(crate) async fn download_string(client: &Client, url: &str) -> Result<String, SyncError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| SyncError::transient(url, err.without_url()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::transient(url, format!("HTTP {status}")));
    }
    response
        .text()
        .await
        .map_err(|err| SyncError::transient(url, err.without_url()))
}

/// Download `url` into a temporary file that is removed when the handle drops.
pub(crate) async fn download_to_temp(
    client: &Client,
    url: &str,
) -> Result<NamedTempFile, SyncError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| SyncError::transient(url, err.without_url()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::transient(url, format!("HTTP {status}")));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| SyncError::transient(url, err.without_url()))?;
    let mut file = NamedTempFile::new()?;
    file.write_all(&bytes)?;
    file.flush()?;
    debug!(bytes = bytes.len(), path = %file.path().display(), "downloaded to temp file");
    Ok(file)
}
