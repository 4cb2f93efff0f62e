//! Manifest types and extraction.
//!
//! A [`Manifest`] is the per-interface artifact: human metadata, a
//! `config` section of scalar schema entries, an `inputs` section of
//! file-classified entries, and a `custom.gearsmith` extension block
//! carrying the originating interface identity and its raw output
//! descriptors. [`extract_manifest`] builds one from an
//! [`InterfaceDescriptor`], applying the normalization and ordering pass
//! after all entries are mapped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MapError, MapWarning};
use crate::param::{InterfaceDescriptor, ParameterSpec};
use crate::schema::{map_parameter, CanonicalSchemaEntry};
use crate::value::TreeValue;

/// Key of the extension block inside the manifest's `custom` section.
pub const CUSTOM_SECTION: &str = "gearsmith";

/// Extension block: everything the resolver needs that the public schema
/// does not carry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionBlock {
    /// Fully-qualified identity of the originating interface.
    pub interface: String,

    /// Raw output parameter descriptors, kept out of the public schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ParameterSpec>,
}

/// The `custom` section: the gearsmith extension block plus opaque
/// pass-through entries supplied by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomSection {
    /// The gearsmith extension block.
    #[serde(rename = "gearsmith")]
    pub gearsmith: ExtensionBlock,

    /// Opaque pass-through entries (packaging hints etc.).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// The per-interface manifest artifact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Identity/name of the packaged interface.
    pub name: String,

    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Authorship, supplied externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Maintainer, supplied externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,

    /// License identifier, supplied externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Source URL, supplied externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Documentation URL, supplied externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Non-file parameters, ordered per the packaging contract.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub config: IndexMap<String, CanonicalSchemaEntry>,

    /// File-classified parameters, ordered per the packaging contract.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, CanonicalSchemaEntry>,

    /// The custom section (extension block + opaque entries).
    pub custom: CustomSection,

    /// Opaque metadata supplied by the caller of composition.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Manifest {
    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the manifest to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns the fully-qualified identity of the originating interface.
    pub fn interface_identity(&self) -> &str {
        &self.custom.gearsmith.interface
    }
}

/// Options controlling one manifest extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Default-value overrides keyed by parameter name.
    pub defaults: IndexMap<String, Value>,

    /// Parameter-name prefix that sorts first within each optionality
    /// group.
    pub preferred_prefix: Option<String>,

    /// Version string to stamp into the manifest.
    pub version: Option<String>,

    /// Suffix name and version with `-dummy` (UI smoke artifacts).
    pub dummy: bool,
}

impl ExtractOptions {
    /// Reads the extraction-relevant keys out of a composed `%params`
    /// mapping: `defaults` and `preferred_prefix`. Remaining keys are
    /// packaging parameters owned by the artifact sink.
    pub fn from_params(params: &IndexMap<String, TreeValue>) -> Self {
        let defaults = params
            .get("defaults")
            .and_then(TreeValue::as_mapping)
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        let preferred_prefix = params
            .get("preferred_prefix")
            .and_then(TreeValue::as_str)
            .map(str::to_string);
        Self {
            defaults,
            preferred_prefix,
            ..Default::default()
        }
    }

    /// Sets the version string.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Enables dummy suffixing.
    pub fn dummy(mut self, dummy: bool) -> Self {
        self.dummy = dummy;
        self
    }
}

/// Extracts the manifest for one interface.
///
/// Maps every input parameter, applies the normalization pass, splits the
/// entries into `config` and `inputs`, orders each section, and stamps
/// metadata. `fields` are the composed `%manifest` overrides.
pub fn extract_manifest(
    descriptor: &InterfaceDescriptor,
    fields: &IndexMap<String, TreeValue>,
    options: &ExtractOptions,
) -> Result<(Manifest, Vec<MapWarning>), MapError> {
    let mut warnings = Vec::new();
    let mut entries: Vec<(String, CanonicalSchemaEntry)> = Vec::new();

    for param in &descriptor.inputs {
        if let Some(mut entry) = map_parameter(param, &mut warnings)? {
            if let Some(default) = options.defaults.get(&param.name) {
                entry.default = Some(default.clone());
            }
            normalize_entry(&param.name, &mut entry, !param.xor.is_empty());
            entries.push((param.name.clone(), entry));
        }
    }

    order_entries(&mut entries, options.preferred_prefix.as_deref());

    let mut config = IndexMap::new();
    let mut inputs = IndexMap::new();
    for (name, entry) in entries {
        if entry.is_file() {
            inputs.insert(name, entry);
        } else {
            config.insert(name, entry);
        }
    }

    let mut manifest = Manifest {
        name: descriptor.short_name().to_string(),
        label: None,
        description: None,
        author: None,
        maintainer: None,
        license: None,
        source: None,
        url: None,
        version: options.version.clone(),
        config,
        inputs,
        custom: CustomSection {
            gearsmith: ExtensionBlock {
                interface: descriptor.identity.clone(),
                outputs: descriptor.outputs.clone(),
            },
            extra: IndexMap::new(),
        },
        extra: IndexMap::new(),
    };

    apply_field_overrides(&mut manifest, fields);

    if options.dummy {
        manifest.name.push_str("-dummy");
        if let Some(version) = manifest.version.as_mut() {
            version.push_str("-dummy");
        }
    }

    if manifest.label.is_none() {
        manifest.label = Some(descriptor.short_name().to_string());
    }

    Ok((manifest, warnings))
}

/// Applies composed `%manifest` overrides onto manifest metadata. Known
/// keys land in their typed fields; everything else passes through.
fn apply_field_overrides(manifest: &mut Manifest, fields: &IndexMap<String, TreeValue>) {
    for (key, value) in fields {
        let text = || match value {
            TreeValue::String(s) => Some(s.clone()),
            TreeValue::Null => None,
            other => Some(serde_json::to_string(&Value::from(other.clone())).unwrap_or_default()),
        };
        match key.as_str() {
            "name" => {
                if let Some(text) = text() {
                    manifest.name = text;
                }
            }
            "label" => manifest.label = text(),
            "description" => manifest.description = text(),
            "author" => manifest.author = text(),
            "maintainer" => manifest.maintainer = text(),
            "license" => manifest.license = text(),
            "source" => manifest.source = text(),
            "url" => manifest.url = text(),
            "version" => manifest.version = text(),
            _ => {
                manifest
                    .extra
                    .insert(key.clone(), Value::from(value.clone()));
            }
        }
    }
}

/// Normalization pass applied after mapping, once per entry.
fn normalize_entry(name: &str, entry: &mut CanonicalSchemaEntry, exclusive: bool) {
    // A member of a mutual-exclusion group cannot be individually
    // mandatory.
    if exclusive {
        entry.optional = Some(true);
    }

    // A description that is empty or carries nothing beyond a default-value
    // annotation gets replaced by one synthesized from the name.
    let trimmed = entry.description.as_deref().map(str::trim).unwrap_or("");
    if trimmed.is_empty() || is_default_annotation(trimmed) {
        entry.description = Some(title_case(name));
    }
    if let Some(default) = &entry.default {
        let annotation = format!(" [default={}]", render_default(default));
        let description = entry.description.get_or_insert_with(String::new);
        if !description.ends_with(&annotation) {
            description.push_str(&annotation);
        }
    }

    // A default makes the field always satisfied.
    if entry.default.is_some() && entry.optional == Some(true) {
        entry.optional = None;
    }
}

/// Contractual section ordering: non-optional entries first, then the
/// preferred prefix within each group, then alphabetical.
fn order_entries(entries: &mut [(String, CanonicalSchemaEntry)], prefix: Option<&str>) {
    entries.sort_by(|(a_name, a), (b_name, b)| {
        let a_key = (
            a.is_optional(),
            !prefix.is_some_and(|p| a_name.starts_with(p)),
        );
        let b_key = (
            b.is_optional(),
            !prefix.is_some_and(|p| b_name.starts_with(p)),
        );
        a_key.cmp(&b_key).then_with(|| a_name.cmp(b_name))
    });
}

/// Returns true when `text` is exactly one `[default=...]` annotation;
/// some introspected descriptions consist of nothing else.
fn is_default_annotation(text: &str) -> bool {
    text.strip_prefix("[default=")
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some()
}

/// Synthesizes a description from a parameter name: word-split on
/// separators, title-cased.
fn title_case(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a default value for the description annotation. Strings render
/// bare, everything else as JSON.
fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
