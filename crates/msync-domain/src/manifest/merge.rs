use serde_yaml::{Mapping, Value};

use super::{
    parse_mapping, string_field, IdentityFields, Manifest, ManifestFragment, ManifestType,
    KEY_CHANNEL,
    KEY_DEFAULT_LOCALE, KEY_LEGACY_ID, KEY_LEGACY_VERSION, KEY_LOCALIZATIONS, KEY_MANIFEST_TYPE,
    KEY_MANIFEST_VERSION, KEY_PACKAGE_IDENTIFIER, KEY_PACKAGE_LOCALE, KEY_PACKAGE_VERSION,
};

/// Fragment combination was rejected; `diagnostics` lists every problem found.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{}", .diagnostics.join("; "))]
pub struct MergeError {
    pub diagnostics: Vec<String>,
}

impl MergeError {
    fn single(message: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![message.into()],
        }
    }
}

/// Keys carried by every fragment that must not be copied into the merged body.
const IDENTITY_KEYS: &[&str] = &[
    KEY_MANIFEST_TYPE,
    KEY_MANIFEST_VERSION,
    KEY_PACKAGE_IDENTIFIER,
    KEY_PACKAGE_VERSION,
    KEY_LEGACY_ID,
    KEY_LEGACY_VERSION,
];

struct ParsedFragment<'a> {
    name: &'a str,
    kind: ManifestType,
    body: Mapping,
}

/// Combines the manifest files found under one directory into a single manifest.
///
/// A lone file is taken as-is. Several files must form a complete multi-file manifest:
/// one `version`, one `installer`, one `defaultLocale` and any number of distinct `locale`
/// fragments, all agreeing on package identifier, package version and manifest version.
pub fn merge_fragments(fragments: &[ManifestFragment]) -> Result<Manifest, MergeError> {
    match fragments {
        [] => Err(MergeError::single("no manifest files to merge")),
        [only] => Manifest::from_yaml(&only.content)
            .map_err(|err| MergeError::single(format!("{}: {err}", only.name))),
        _ => merge_multi_file(fragments),
    }
}

fn merge_multi_file(fragments: &[ManifestFragment]) -> Result<Manifest, MergeError> {
    let mut diagnostics = Vec::new();
    let mut parsed = Vec::with_capacity(fragments.len());
    let mut identity: Option<(String, String, Option<String>)> = None;

    for fragment in fragments {
        let parsed_fragment = parse_mapping(&fragment.content).and_then(|body| {
            IdentityFields::from_yaml(&fragment.content).map(|fields| (body, fields))
        });
        let (body, fields) = match parsed_fragment {
            Ok(parsed) => parsed,
            Err(err) => {
                diagnostics.push(format!("{}: {err}", fragment.name));
                continue;
            }
        };
        let Some(raw_kind) = fields.manifest_type() else {
            diagnostics.push(format!(
                "{}: missing required field '{KEY_MANIFEST_TYPE}'",
                fragment.name
            ));
            continue;
        };
        let Some(kind) = ManifestType::parse(&raw_kind) else {
            diagnostics.push(format!(
                "{}: unsupported {KEY_MANIFEST_TYPE} '{raw_kind}'",
                fragment.name
            ));
            continue;
        };
        let (Some(id), Some(version)) = (fields.id(), fields.version()) else {
            diagnostics.push(format!(
                "{}: missing '{KEY_PACKAGE_IDENTIFIER}' or '{KEY_PACKAGE_VERSION}'",
                fragment.name
            ));
            continue;
        };
        let manifest_version = fields.manifest_version();
        match &identity {
            None => identity = Some((id, version, manifest_version)),
            Some((first_id, first_version, first_manifest_version)) => {
                if !first_id.eq_ignore_ascii_case(&id) {
                    diagnostics.push(format!(
                        "{}: {KEY_PACKAGE_IDENTIFIER} '{id}' does not match '{first_id}'",
                        fragment.name
                    ));
                }
                if *first_version != version {
                    diagnostics.push(format!(
                        "{}: {KEY_PACKAGE_VERSION} '{version}' does not match '{first_version}'",
                        fragment.name
                    ));
                }
                if manifest_version.is_some() && *first_manifest_version != manifest_version {
                    diagnostics.push(format!(
                        "{}: {KEY_MANIFEST_VERSION} differs from other manifest files",
                        fragment.name
                    ));
                }
            }
        }
        parsed.push(ParsedFragment {
            name: &fragment.name,
            kind,
            body,
        });
    }

    let mut version: Option<ParsedFragment<'_>> = None;
    let mut installer: Option<ParsedFragment<'_>> = None;
    let mut default_locale: Option<ParsedFragment<'_>> = None;
    let mut locales = Vec::new();
    for fragment in parsed {
        let slot = match fragment.kind {
            ManifestType::Version => &mut version,
            ManifestType::Installer => &mut installer,
            ManifestType::DefaultLocale => &mut default_locale,
            ManifestType::Locale => {
                locales.push(fragment);
                continue;
            }
            ManifestType::Singleton | ManifestType::Merged => {
                diagnostics.push(format!(
                    "{}: a {} manifest cannot be combined with other files",
                    fragment.name, fragment.kind
                ));
                continue;
            }
        };
        if let Some(existing) = slot.as_ref() {
            diagnostics.push(format!(
                "{}: duplicate {} manifest (already provided by {})",
                fragment.name, fragment.kind, existing.name
            ));
            continue;
        }
        *slot = Some(fragment);
    }

    for (slot, kind) in [
        (&version, ManifestType::Version),
        (&installer, ManifestType::Installer),
        (&default_locale, ManifestType::DefaultLocale),
    ] {
        if slot.is_none() {
            diagnostics.push(format!("missing {kind} manifest"));
        }
    }

    let default_tag = default_locale
        .as_ref()
        .and_then(|fragment| string_field(&fragment.body, KEY_PACKAGE_LOCALE));
    if let (Some(version), Some(default_locale)) = (&version, &default_locale) {
        let declared = string_field(&version.body, KEY_DEFAULT_LOCALE);
        match (&declared, &default_tag) {
            (Some(declared), Some(tag)) if declared.eq_ignore_ascii_case(tag) => {}
            (Some(declared), Some(tag)) => diagnostics.push(format!(
                "{}: {KEY_DEFAULT_LOCALE} '{declared}' does not match {KEY_PACKAGE_LOCALE} '{tag}' of {}",
                version.name, default_locale.name
            )),
            (None, _) => diagnostics.push(format!(
                "{}: missing required field '{KEY_DEFAULT_LOCALE}'",
                version.name
            )),
            (_, None) => diagnostics.push(format!(
                "{}: missing required field '{KEY_PACKAGE_LOCALE}'",
                default_locale.name
            )),
        }
    }

    let mut seen_tags: Vec<String> = default_tag.iter().map(|t| t.to_ascii_lowercase()).collect();
    for locale in &locales {
        match string_field(&locale.body, KEY_PACKAGE_LOCALE) {
            Some(tag) if seen_tags.contains(&tag.to_ascii_lowercase()) => diagnostics.push(
                format!("{}: locale '{tag}' is provided more than once", locale.name),
            ),
            Some(tag) => seen_tags.push(tag.to_ascii_lowercase()),
            None => diagnostics.push(format!(
                "{}: missing required field '{KEY_PACKAGE_LOCALE}'",
                locale.name
            )),
        }
    }

    if !diagnostics.is_empty() {
        return Err(MergeError { diagnostics });
    }
    let (Some((id, package_version, manifest_version)), Some(version), Some(installer), Some(default_locale)) =
        (identity, version, installer, default_locale)
    else {
        return Err(MergeError::single("incomplete multi-file manifest"));
    };

    let mut merged = Mapping::new();
    merged.insert(KEY_PACKAGE_IDENTIFIER.into(), Value::String(id));
    merged.insert(KEY_PACKAGE_VERSION.into(), Value::String(package_version));
    if let Some(channel) = version.body.get(KEY_CHANNEL) {
        merged.insert(KEY_CHANNEL.into(), channel.clone());
    }
    copy_body(&mut merged, &version.body, &[KEY_CHANNEL, KEY_DEFAULT_LOCALE]);
    copy_body(&mut merged, &default_locale.body, &[]);
    copy_body(&mut merged, &installer.body, &[]);
    if !locales.is_empty() {
        let localizations = locales
            .into_iter()
            .map(|locale| Value::Mapping(strip_identity(locale.body)))
            .collect();
        merged.insert(KEY_LOCALIZATIONS.into(), Value::Sequence(localizations));
    }
    merged.insert(
        KEY_MANIFEST_TYPE.into(),
        Value::String(ManifestType::Merged.as_str().to_string()),
    );
    if let Some(manifest_version) = manifest_version {
        merged.insert(KEY_MANIFEST_VERSION.into(), Value::String(manifest_version));
    }

    Manifest::from_mapping(merged).map_err(|err| MergeError::single(err.to_string()))
}

fn copy_body(target: &mut Mapping, source: &Mapping, skip: &[&str]) {
    for (key, value) in source {
        let Some(name) = key.as_str() else {
            continue;
        };
        if IDENTITY_KEYS.contains(&name) || skip.contains(&name) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

fn strip_identity(mut body: Mapping) -> Mapping {
    for key in IDENTITY_KEYS {
        body.remove(*key);
    }
    body
}
