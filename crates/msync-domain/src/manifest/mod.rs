//! Manifest documents as they appear in the source tree.
//!
//! A package version is described either by a single `singleton` file or by several
//! fragments (`version`, `installer`, `defaultLocale`, `locale`) living in one directory.
//! [`merge_fragments`] folds a directory's fragments into one [`Manifest`]; [`package`]
//! turns that manifest into the catalog's JSON record.

use std::fmt;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

mod merge;
pub mod package;

pub use merge::{merge_fragments, MergeError};
pub use package::{add_manifest_to_package_manifest, PackageManifest, PackageVersionEntry};

pub(crate) const KEY_PACKAGE_IDENTIFIER: &str = "PackageIdentifier";
pub(crate) const KEY_LEGACY_ID: &str = "Id";
pub(crate) const KEY_PACKAGE_VERSION: &str = "PackageVersion";
pub(crate) const KEY_LEGACY_VERSION: &str = "Version";
pub(crate) const KEY_MANIFEST_TYPE: &str = "ManifestType";
pub(crate) const KEY_MANIFEST_VERSION: &str = "ManifestVersion";
pub(crate) const KEY_DEFAULT_LOCALE: &str = "DefaultLocale";
pub(crate) const KEY_PACKAGE_LOCALE: &str = "PackageLocale";
pub(crate) const KEY_CHANNEL: &str = "Channel";
pub(crate) const KEY_INSTALLERS: &str = "Installers";
pub(crate) const KEY_LOCALIZATIONS: &str = "Localizations";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid YAML: {0}")]
    Parse(String),
    #[error("manifest root must be a mapping")]
    NotAMapping,
    #[error("manifest is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("manifest cannot be represented as JSON: {0}")]
    Json(String),
}

/// `ManifestType` values understood by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestType {
    Singleton,
    Version,
    Installer,
    DefaultLocale,
    Locale,
    Merged,
}

impl ManifestType {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "singleton" => Some(Self::Singleton),
            "version" => Some(Self::Version),
            "installer" => Some(Self::Installer),
            "defaultlocale" => Some(Self::DefaultLocale),
            "locale" => Some(Self::Locale),
            "merged" => Some(Self::Merged),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Version => "version",
            Self::Installer => "installer",
            Self::DefaultLocale => "defaultLocale",
            Self::Locale => "locale",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for ManifestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file read from a manifest directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFragment {
    pub name: String,
    pub content: String,
}

impl ManifestFragment {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// The identifying fields of a manifest, readable from any fragment type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinManifestInfo {
    pub id: String,
    pub version: Option<String>,
}

impl MinManifestInfo {
    /// Reads the package identifier (or the legacy `Id` key) from raw manifest text.
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        parse_mapping(content)?;
        let identity = IdentityFields::from_yaml(content)?;
        let id = identity
            .id()
            .ok_or(ManifestError::MissingField(KEY_PACKAGE_IDENTIFIER))?;
        Ok(Self {
            id,
            version: identity.version(),
        })
    }
}

/// Identity keys read as their literal scalar text.
///
/// Going through `Value` would type `1.10` as a float and render it back as `1.1`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IdentityFields {
    #[serde(rename = "PackageIdentifier", default)]
    package_identifier: Option<String>,
    #[serde(rename = "Id", default)]
    legacy_id: Option<String>,
    #[serde(rename = "PackageVersion", default)]
    package_version: Option<String>,
    #[serde(rename = "Version", default)]
    legacy_version: Option<String>,
    #[serde(rename = "ManifestType", default)]
    manifest_type: Option<String>,
    #[serde(rename = "ManifestVersion", default)]
    manifest_version: Option<String>,
}

impl IdentityFields {
    pub(crate) fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(content).map_err(|err| ManifestError::Parse(err.to_string()))
    }

    pub(crate) fn id(&self) -> Option<String> {
        non_empty(self.package_identifier.as_deref())
            .or_else(|| non_empty(self.legacy_id.as_deref()))
    }

    pub(crate) fn version(&self) -> Option<String> {
        non_empty(self.package_version.as_deref())
            .or_else(|| non_empty(self.legacy_version.as_deref()))
    }

    pub(crate) fn manifest_type(&self) -> Option<String> {
        non_empty(self.manifest_type.as_deref())
    }

    pub(crate) fn manifest_version(&self) -> Option<String> {
        non_empty(self.manifest_version.as_deref())
    }

    /// Rewrites the identity keys present in `document` with their literal text.
    fn apply_to(&self, document: &mut Mapping) {
        for (key, text) in [
            (KEY_PACKAGE_IDENTIFIER, &self.package_identifier),
            (KEY_LEGACY_ID, &self.legacy_id),
            (KEY_PACKAGE_VERSION, &self.package_version),
            (KEY_LEGACY_VERSION, &self.legacy_version),
            (KEY_MANIFEST_VERSION, &self.manifest_version),
        ] {
            if let (Some(slot), Some(text)) = (document.get_mut(key), text) {
                *slot = Value::String(text.trim().to_string());
            }
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

/// A complete manifest for one package version: either a singleton or a merged document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    id: String,
    version: String,
    document: Mapping,
}

impl Manifest {
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        let mut document = parse_mapping(content)?;
        let identity = IdentityFields::from_yaml(content)?;
        identity.apply_to(&mut document);
        Self::from_mapping(document)
    }

    /// Builds a manifest from a document whose identity keys are already strings.
    pub(crate) fn from_mapping(document: Mapping) -> Result<Self, ManifestError> {
        let id = string_field(&document, KEY_PACKAGE_IDENTIFIER)
            .or_else(|| string_field(&document, KEY_LEGACY_ID))
            .ok_or(ManifestError::MissingField(KEY_PACKAGE_IDENTIFIER))?;
        let version = string_field(&document, KEY_PACKAGE_VERSION)
            .or_else(|| string_field(&document, KEY_LEGACY_VERSION))
            .ok_or(ManifestError::MissingField(KEY_PACKAGE_VERSION))?;
        Ok(Self {
            id,
            version,
            document,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn document(&self) -> &Mapping {
        &self.document
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }
}

pub(crate) fn parse_mapping(content: &str) -> Result<Mapping, ManifestError> {
    let value: Value =
        serde_yaml::from_str(content).map_err(|err| ManifestError::Parse(err.to_string()))?;
    match value {
        Value::Mapping(map) => Ok(map),
        _ => Err(ManifestError::NotAMapping),
    }
}

/// String-valued field, trimmed; empty values count as absent.
pub(crate) fn string_field(map: &Mapping, key: &str) -> Option<String> {
    non_empty(map.get(key)?.as_str())
}
