use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context};

pub const ENV_CATALOG_ENDPOINT: &str = "MSYNC_CATALOG_ENDPOINT";
pub const ENV_FUNCTION_KEY: &str = "MSYNC_FUNCTION_KEY";
pub const ENV_MANIFEST_CACHE_ENDPOINT: &str = "MSYNC_MANIFEST_CACHE_ENDPOINT";
pub const ENV_GITHUB_REPOSITORY: &str = "MSYNC_GITHUB_REPOSITORY";
pub const ENV_GITHUB_TOKEN: &str = "MSYNC_GITHUB_TOKEN";
pub const ENV_GITHUB_API: &str = "MSYNC_GITHUB_API";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "MSYNC_HTTP_TIMEOUT_SECS";
pub const ENV_KEEP_PROXIES: &str = "MSYNC_KEEP_PROXIES";

const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Point-in-time copy of the environment variables settings are read from.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value with surrounding whitespace removed; blank values count as unset.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) catalog: CatalogConfig,
    pub(crate) manifest_cache: ManifestCacheConfig,
    pub(crate) github: GitHubConfig,
    pub(crate) network: NetworkConfig,
}

impl Settings {
    /// Builds settings from the current process environment.
    ///
    /// # Errors
    /// Returns an error when a numeric setting cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    /// Builds settings from an explicit snapshot. Required endpoints are not checked here;
    /// the components that need them report their absence when constructed.
    ///
    /// # Errors
    /// Returns an error when a numeric setting cannot be parsed.
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> anyhow::Result<Self> {
        let timeout_secs = match snapshot.non_empty(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("{ENV_HTTP_TIMEOUT_SECS} must be a number of seconds"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(anyhow!("{ENV_HTTP_TIMEOUT_SECS} must be greater than zero"));
        }
        Ok(Self {
            catalog: CatalogConfig {
                endpoint: snapshot.non_empty(ENV_CATALOG_ENDPOINT),
                function_key: snapshot.non_empty(ENV_FUNCTION_KEY),
            },
            manifest_cache: ManifestCacheConfig {
                endpoint: snapshot.non_empty(ENV_MANIFEST_CACHE_ENDPOINT),
            },
            github: GitHubConfig {
                api_base: snapshot
                    .non_empty(ENV_GITHUB_API)
                    .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
                repository: snapshot.non_empty(ENV_GITHUB_REPOSITORY),
                token: snapshot.non_empty(ENV_GITHUB_TOKEN),
            },
            network: NetworkConfig {
                timeout: Duration::from_secs(timeout_secs),
                keep_proxies: crate::net::keep_proxies(snapshot),
            },
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    #[must_use]
    pub fn manifest_cache(&self) -> &ManifestCacheConfig {
        &self.manifest_cache
    }

    #[must_use]
    pub fn github(&self) -> &GitHubConfig {
        &self.github
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

#[derive(Clone)]
pub struct CatalogConfig {
    pub endpoint: Option<String>,
    pub function_key: Option<String>,
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("endpoint", &self.endpoint)
            .field("function_key", &self.function_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ManifestCacheConfig {
    pub endpoint: Option<String>,
}

#[derive(Clone)]
pub struct GitHubConfig {
    pub api_base: String,
    pub repository: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("repository", &self.repository)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub timeout: Duration,
    pub keep_proxies: bool,
}
