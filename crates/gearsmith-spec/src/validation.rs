//! Structural manifest validation.
//!
//! Checks the invariants the packaging target relies on: the file/non-file
//! split between `inputs` and `config`, name format, enum and bound
//! consistency, and config ordering. Sinks run this before publishing.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode};
use crate::manifest::Manifest;
use crate::schema::{CanonicalSchemaEntry, CanonicalType};

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap())
}

/// Validates one manifest, collecting all findings rather than stopping at
/// the first.
pub fn validate_manifest(manifest: &Manifest) -> ValidationResult {
    let mut result = ValidationResult::success();

    if !name_regex().is_match(&manifest.name) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidName,
            format!(
                "name '{}' must be alphanumeric with '-' or '_' separators",
                manifest.name
            ),
            "name",
        ));
    }

    if manifest.label.is_none() {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::MissingLabel,
            "manifest has no label",
            "label",
        ));
    }

    let identity = manifest.interface_identity();
    if identity.is_empty() || !identity.contains(':') {
        result.add_error(ValidationError::with_path(
            ErrorCode::MissingInterface,
            "custom section must carry a 'namespace.path:Name' interface identity",
            "custom.gearsmith.interface",
        ));
    }

    for key in manifest.config.keys() {
        if manifest.inputs.contains_key(key) {
            result.add_error(ValidationError::with_path(
                ErrorCode::DuplicateKey,
                format!("'{}' appears in both config and inputs", key),
                format!("config.{}", key),
            ));
        }
    }

    for (key, entry) in &manifest.inputs {
        let path = format!("inputs.{}", key);
        if !entry.is_file() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InputNotFileBased,
                format!("input '{}' is not file-based", key),
                path.clone(),
            ));
        }
        if !entry.is_optional() && entry.default.is_some() {
            result.add_warning(ValidationWarning::with_path(
                WarningCode::MandatoryWithDefault,
                format!("mandatory input '{}' carries a default value", key),
                path.clone(),
            ));
        }
        check_entry(key, entry, &path, &mut result);
    }

    let mut seen_optional: Option<String> = None;
    for (key, entry) in &manifest.config {
        let path = format!("config.{}", key);
        if entry.is_file() {
            result.add_error(ValidationError::with_path(
                ErrorCode::FileBasedConfig,
                format!("config entry '{}' is file-based; it belongs in inputs", key),
                path.clone(),
            ));
        }
        if entry.entry_type.is_none() {
            result.add_error(ValidationError::with_path(
                ErrorCode::UntypedEntry,
                format!("config entry '{}' has no type", key),
                path.clone(),
            ));
        }
        // Mandatory entries must come before optional ones.
        if entry.is_optional() {
            seen_optional.get_or_insert_with(|| key.clone());
        } else if let Some(optional) = &seen_optional {
            result.add_error(ValidationError::with_path(
                ErrorCode::OrderingViolation,
                format!("mandatory '{}' is ordered after optional '{}'", key, optional),
                path.clone(),
            ));
        }
        check_entry(key, entry, &path, &mut result);
    }

    result
}

/// Per-entry checks shared between config and inputs.
fn check_entry(key: &str, entry: &CanonicalSchemaEntry, path: &str, result: &mut ValidationResult) {
    if entry.description.is_none() {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::MissingDescription,
            format!("'{}' has no description", key),
            path.to_string(),
        ));
    }

    if let (Some(entry_type), Some(allowed)) = (entry.entry_type, &entry.allowed) {
        for value in allowed {
            if !value_matches_type(value, entry_type) {
                result.add_error(ValidationError::with_path(
                    ErrorCode::MixedEnumValues,
                    format!(
                        "allowed value {} of '{}' does not match declared type {}",
                        value, key, entry_type
                    ),
                    path.to_string(),
                ));
            }
        }
    }

    if let (Some(min), Some(max)) = (&entry.minimum, &entry.maximum) {
        let (min, max) = (min.as_f64(), max.as_f64());
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidBounds,
                    format!("'{}' has minimum {} above maximum {}", key, min, max),
                    path.to_string(),
                ));
            }
        }
    }
}

fn value_matches_type(value: &Value, entry_type: CanonicalType) -> bool {
    match entry_type {
        CanonicalType::Integer => value.is_i64() || value.is_u64(),
        CanonicalType::Number => value.is_number(),
        CanonicalType::Boolean => value.is_boolean(),
        CanonicalType::String => value.is_string(),
    }
}
