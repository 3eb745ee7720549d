//! The catalog's JSON record for a package and how a manifest is folded into it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::{
    Manifest, ManifestError, KEY_CHANNEL, KEY_INSTALLERS, KEY_LEGACY_ID, KEY_LEGACY_VERSION,
    KEY_LOCALIZATIONS, KEY_MANIFEST_TYPE, KEY_MANIFEST_VERSION, KEY_PACKAGE_IDENTIFIER,
    KEY_PACKAGE_VERSION,
};

/// Root-level manifest keys that describe the default locale rather than installers.
const LOCALE_KEYS: &[&str] = &[
    "PackageLocale",
    "Publisher",
    "PublisherUrl",
    "PublisherSupportUrl",
    "PrivacyUrl",
    "Author",
    "PackageName",
    "PackageUrl",
    "License",
    "LicenseUrl",
    "Copyright",
    "CopyrightUrl",
    "ShortDescription",
    "Description",
    "Moniker",
    "Tags",
    "Agreements",
    "ReleaseNotes",
    "ReleaseNotesUrl",
    "PurchaseUrl",
    "InstallationNotes",
    "Documentations",
    "Icons",
];

const SKIPPED_KEYS: &[&str] = &[
    KEY_PACKAGE_IDENTIFIER,
    KEY_PACKAGE_VERSION,
    KEY_LEGACY_ID,
    KEY_LEGACY_VERSION,
    KEY_MANIFEST_TYPE,
    KEY_MANIFEST_VERSION,
    "DefaultLocale",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageManifest {
    pub package_identifier: String,
    #[serde(default)]
    pub versions: Vec<PackageVersionEntry>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageVersionEntry {
    pub package_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub default_locale: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installers: Vec<JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl PackageManifest {
    #[must_use]
    pub fn new(package_identifier: impl Into<String>) -> Self {
        Self {
            package_identifier: package_identifier.into(),
            versions: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Inserts `entry`, replacing any existing entry with the same version.
    pub fn upsert_version(&mut self, entry: PackageVersionEntry) {
        match self
            .versions
            .iter_mut()
            .find(|existing| existing.package_version == entry.package_version)
        {
            Some(existing) => *existing = entry,
            None => self.versions.push(entry),
        }
        self.versions
            .sort_by(|a, b| compare_versions(&a.package_version, &b.package_version));
    }
}

impl PackageVersionEntry {
    /// Splits a manifest's root fields into default-locale data, installers and locales.
    /// Root-level installer fields become defaults for every installer that lacks them.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        let root = match serde_json::to_value(manifest.document())
            .map_err(|err| ManifestError::Json(err.to_string()))?
        {
            JsonValue::Object(map) => map,
            _ => return Err(ManifestError::NotAMapping),
        };

        let mut channel = None;
        let mut default_locale = Map::new();
        let mut installer_defaults = Map::new();
        let mut installers = Vec::new();
        let mut locales = Vec::new();
        for (key, value) in root {
            match key.as_str() {
                key if SKIPPED_KEYS.contains(&key) => {}
                KEY_CHANNEL => channel = value.as_str().map(ToString::to_string),
                KEY_INSTALLERS => installers = into_array(value),
                KEY_LOCALIZATIONS => locales = into_array(value),
                key if LOCALE_KEYS.contains(&key) => {
                    default_locale.insert(key.to_string(), value);
                }
                _ => {
                    installer_defaults.insert(key, value);
                }
            }
        }

        for installer in &mut installers {
            if let JsonValue::Object(fields) = installer {
                for (key, value) in &installer_defaults {
                    fields.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }

        Ok(Self {
            package_version: manifest.version().to_string(),
            channel,
            default_locale,
            locales,
            installers,
            extra: Map::new(),
        })
    }
}

/// Folds `manifest` into the catalog record stored for its package, if any.
///
/// `prior` is the record's stored `Data` payload. The result carries the prior record's
/// other versions untouched; a version already present is replaced wholesale.
pub fn add_manifest_to_package_manifest(
    manifest: &Manifest,
    prior: Option<&JsonValue>,
) -> Result<PackageManifest, ManifestError> {
    let mut package = match prior {
        Some(value) if !value.is_null() => serde_json::from_value::<PackageManifest>(value.clone())
            .map_err(|err| ManifestError::Json(err.to_string()))?,
        _ => PackageManifest::new(manifest.id()),
    };
    package.upsert_version(PackageVersionEntry::from_manifest(manifest)?);
    Ok(package)
}

/// Orders dotted versions numerically where both segments are numbers.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut lhs = left.split(['.', '-', '+']);
    let mut rhs = right.split(['.', '-', '+']);
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(a), Some(b)) => {
                let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn into_array(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}
