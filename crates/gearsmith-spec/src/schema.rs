//! The type/trait mapper: one parameter descriptor in, one canonical
//! schema entry out.
//!
//! The mapper is a stateless dispatch over [`TypeTag`]. It returns
//! `Ok(None)` when a parameter is deliberately opted out (denylisted
//! names, internal helper parameters, defective enums) and an error when
//! the shape has no packaging-format representation at all. Description
//! normalization, optionality post-processing, and ordering live with the
//! manifest builder, not here.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{MapError, MapWarning};
use crate::param::{DefaultKind, ParameterSpec, RangeBase, TypeTag};

/// Parameter names skipped regardless of type: cross-cutting knobs of the
/// source framework that have no place in a packaged manifest.
pub const SKIP_PARAMS: &[&str] = &["ignore_exception", "terminal_output", "environ", "args"];

/// Suffix marking internal helper parameters that only back another
/// declared parameter.
pub const HELPER_SUFFIX: &str = "_items";

/// Canonical scalar types of the packaging format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    /// Whole numbers.
    Integer,
    /// Floating-point numbers.
    Number,
    /// Booleans.
    Boolean,
    /// Free text.
    String,
}

impl CanonicalType {
    /// Returns the canonical type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalType::Integer => "integer",
            CanonicalType::Number => "number",
            CanonicalType::Boolean => "boolean",
            CanonicalType::String => "string",
        }
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File classification marker for non-scalar entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileBase {
    /// A single bound file (directories included).
    File,
}

/// The portable, source-independent representation of one parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalSchemaEntry {
    /// Canonical scalar type; absent for file-classified entries.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<CanonicalType>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Whether the parameter may be left unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// Allowed literal values for enumerated parameters.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    /// Lower bound for range parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,

    /// Upper bound for range parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,

    /// Element schema, reserved for a future multi-valued representation;
    /// never populated by this mapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<CanonicalSchemaEntry>>,

    /// File classification; set exactly for entries that bind files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<FileBase>,
}

impl CanonicalSchemaEntry {
    /// Returns true if this entry is file-classified.
    pub fn is_file(&self) -> bool {
        self.base.is_some()
    }

    /// Returns true if this entry may be left unset.
    pub fn is_optional(&self) -> bool {
        self.optional == Some(true)
    }
}

/// Maps one parameter descriptor into a canonical schema entry.
///
/// Returns `Ok(None)` when the parameter is deliberately omitted from all
/// manifest sections; pushes a [`MapWarning`] for non-fatal findings.
pub fn map_parameter(
    param: &ParameterSpec,
    warnings: &mut Vec<MapWarning>,
) -> Result<Option<CanonicalSchemaEntry>, MapError> {
    if SKIP_PARAMS.contains(&param.name.as_str()) || param.name.ends_with(HELPER_SUFFIX) {
        return Ok(None);
    }

    match &param.tag {
        TypeTag::Int => Ok(Some(scalar_entry(CanonicalType::Integer, param, warnings))),
        TypeTag::Float => Ok(Some(scalar_entry(CanonicalType::Number, param, warnings))),
        TypeTag::Bool => Ok(Some(scalar_entry(CanonicalType::Boolean, param, warnings))),
        TypeTag::Str => Ok(Some(scalar_entry(CanonicalType::String, param, warnings))),
        TypeTag::Enum { values } => Ok(enum_entry(values, param, warnings)),
        TypeTag::Range { base, low, high } => {
            Ok(Some(range_entry(*base, *low, *high, param, warnings)))
        }
        TypeTag::File | TypeTag::Directory => Ok(Some(file_entry(param, warnings))),
        TypeTag::MultiPath { inner } => match inner.as_ref() {
            TypeTag::File | TypeTag::Directory => Ok(Some(file_entry(param, warnings))),
            TypeTag::Str => Ok(Some(scalar_entry(CanonicalType::String, param, warnings))),
            other => Err(MapError::UnsupportedMultiPath {
                param: param.name.clone(),
                inner: other.shape_name().to_string(),
            }),
        },
        TypeTag::List { .. } | TypeTag::Tuple { .. } => Err(MapError::UnsupportedSequence {
            param: param.name.clone(),
        }),
        TypeTag::Compound { .. } => Err(MapError::UnsupportedCompound {
            param: param.name.clone(),
        }),
    }
}

/// Builds the common fields shared by every entry shape.
fn base_entry(param: &ParameterSpec, warnings: &mut Vec<MapWarning>) -> CanonicalSchemaEntry {
    let mut entry = CanonicalSchemaEntry {
        description: param.description.clone(),
        ..Default::default()
    };
    if param.default.is_some() && param.default_kind != DefaultKind::Value {
        warnings.push(MapWarning {
            param: param.name.clone(),
            message: format!(
                "default of storage kind '{:?}' is not representable; carried as-is",
                param.default_kind
            ),
        });
    }
    if !param.mandatory {
        entry.optional = Some(true);
    }
    entry
}

/// Scalar handler: integer / number / boolean / string.
fn scalar_entry(
    canonical: CanonicalType,
    param: &ParameterSpec,
    warnings: &mut Vec<MapWarning>,
) -> CanonicalSchemaEntry {
    let mut entry = base_entry(param, warnings);
    entry.entry_type = Some(canonical);
    if let Some(default) = &param.default {
        entry.default = Some(cast_value(canonical, default, &param.name, warnings));
    }
    entry
}

/// File/directory handler: a file-classified entry with no scalar type.
fn file_entry(param: &ParameterSpec, warnings: &mut Vec<MapWarning>) -> CanonicalSchemaEntry {
    let mut entry = base_entry(param, warnings);
    entry.base = Some(FileBase::File);
    entry.default = param.default.clone();
    entry
}

/// Range handler: canonical type from the bound validator's base type,
/// bounds copied when not unbounded, default falling back to the lower
/// bound when the parameter carries none.
fn range_entry(
    base: RangeBase,
    low: Option<f64>,
    high: Option<f64>,
    param: &ParameterSpec,
    warnings: &mut Vec<MapWarning>,
) -> CanonicalSchemaEntry {
    let canonical = match base {
        RangeBase::Int => CanonicalType::Integer,
        RangeBase::Float => CanonicalType::Number,
    };
    let mut entry = base_entry(param, warnings);
    entry.entry_type = Some(canonical);
    entry.minimum = low.and_then(|v| bound_number(canonical, v));
    entry.maximum = high.and_then(|v| bound_number(canonical, v));
    let default = param
        .default
        .clone()
        .or_else(|| low.map(|v| bound_value(canonical, v)));
    if let Some(default) = default {
        entry.default = Some(cast_value(canonical, &default, &param.name, warnings));
    }
    entry
}

/// Enum handler: canonical type inferred from the common type of all
/// allowed values. Empty or mixed-type value sets are reported and the
/// parameter is dropped.
fn enum_entry(
    values: &[Value],
    param: &ParameterSpec,
    warnings: &mut Vec<MapWarning>,
) -> Option<CanonicalSchemaEntry> {
    let canonical = match common_value_type(values) {
        Some(canonical) => canonical,
        None => {
            warnings.push(MapWarning {
                param: param.name.clone(),
                message: if values.is_empty() {
                    "enumerated parameter without values".to_string()
                } else {
                    "cannot map mixed-type enum values to one base type".to_string()
                },
            });
            return None;
        }
    };
    let mut entry = base_entry(param, warnings);
    entry.entry_type = Some(canonical);
    entry.allowed = Some(values.to_vec());
    if let Some(default) = &param.default {
        entry.default = Some(cast_value(canonical, default, &param.name, warnings));
    }
    Some(entry)
}

/// Normalization of JSON value kinds to the canonical scalar set.
///
/// Returns `None` for empty sets, mixed kinds, and non-scalar values.
/// Integer and floating-point numbers are distinct kinds here, matching
/// the source type system's strict value typing.
fn common_value_type(values: &[Value]) -> Option<CanonicalType> {
    let mut common: Option<CanonicalType> = None;
    for value in values {
        let kind = match value {
            Value::Bool(_) => CanonicalType::Boolean,
            Value::String(_) => CanonicalType::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => CanonicalType::Integer,
            Value::Number(_) => CanonicalType::Number,
            _ => return None,
        };
        match common {
            None => common = Some(kind),
            Some(seen) if seen == kind => {}
            Some(_) => return None,
        }
    }
    common
}

/// Casts a default value to its canonical type, carrying the original and
/// recording a warning when the cast is not possible.
fn cast_value(
    canonical: CanonicalType,
    value: &Value,
    param: &str,
    warnings: &mut Vec<MapWarning>,
) -> Value {
    let cast = match canonical {
        CanonicalType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::Number(n) => n.as_f64().map(|f| Value::from(f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            Value::Bool(b) => Some(Value::from(*b as i64)),
            _ => None,
        },
        CanonicalType::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
            _ => None,
        },
        CanonicalType::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.trim() {
                "true" | "True" => Some(Value::from(true)),
                "false" | "False" => Some(Value::from(false)),
                _ => None,
            },
            _ => None,
        },
        CanonicalType::String => match value {
            Value::String(_) => Some(value.clone()),
            Value::Number(n) => Some(Value::from(n.to_string())),
            Value::Bool(b) => Some(Value::from(b.to_string())),
            _ => None,
        },
    };
    match cast {
        Some(cast) => cast,
        None => {
            warnings.push(MapWarning {
                param: param.to_string(),
                message: format!("default {} does not cast to {}", value, canonical),
            });
            value.clone()
        }
    }
}

/// Converts a raw bound into a JSON number of the canonical type.
fn bound_number(canonical: CanonicalType, value: f64) -> Option<Number> {
    match canonical {
        CanonicalType::Integer => Some(Number::from(value as i64)),
        _ => Number::from_f64(value),
    }
}

fn bound_value(canonical: CanonicalType, value: f64) -> Value {
    match bound_number(canonical, value) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map_ok(param: &ParameterSpec) -> CanonicalSchemaEntry {
        let mut warnings = Vec::new();
        map_parameter(param, &mut warnings)
            .expect("should map")
            .expect("should not be skipped")
    }

    #[test]
    fn test_denylisted_and_helper_names_skipped() {
        let mut warnings = Vec::new();
        for name in ["ignore_exception", "terminal_output", "transforms_items"] {
            let param = ParameterSpec::new(name, TypeTag::Int);
            assert_eq!(map_parameter(&param, &mut warnings).unwrap(), None);
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(
            map_ok(&ParameterSpec::new("dimension", TypeTag::Int)).entry_type,
            Some(CanonicalType::Integer)
        );
        assert_eq!(
            map_ok(&ParameterSpec::new("smoothing", TypeTag::Float)).entry_type,
            Some(CanonicalType::Number)
        );
        assert_eq!(
            map_ok(&ParameterSpec::new("verbose", TypeTag::Bool)).entry_type,
            Some(CanonicalType::Boolean)
        );
        assert_eq!(
            map_ok(&ParameterSpec::new("prefix", TypeTag::Str)).entry_type,
            Some(CanonicalType::String)
        );
    }

    #[test]
    fn test_optional_unless_mandatory() {
        let entry = map_ok(&ParameterSpec::new("prefix", TypeTag::Str));
        assert_eq!(entry.optional, Some(true));

        let entry = map_ok(&ParameterSpec::new("prefix", TypeTag::Str).mandatory());
        assert_eq!(entry.optional, None);
    }

    #[test]
    fn test_default_cast() {
        let entry = map_ok(
            &ParameterSpec::new("dimension", TypeTag::Int).default_value(json!("3")),
        );
        assert_eq!(entry.default, Some(json!(3)));
    }

    #[test]
    fn test_computed_default_warns() {
        let mut warnings = Vec::new();
        let param = ParameterSpec::new("seed", TypeTag::Int)
            .default_value(json!(0))
            .default_kind(DefaultKind::Computed);
        map_parameter(&param, &mut warnings).unwrap().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].param, "seed");
    }

    #[test]
    fn test_enum_of_strings() {
        let param = ParameterSpec::new(
            "transformation_model",
            TypeTag::Enum {
                values: vec![json!("SyN"), json!("Affine")],
            },
        );
        let entry = map_ok(&param);
        assert_eq!(entry.entry_type, Some(CanonicalType::String));
        assert_eq!(entry.allowed, Some(vec![json!("SyN"), json!("Affine")]));
    }

    #[test]
    fn test_enum_of_integers() {
        let param = ParameterSpec::new(
            "dimension",
            TypeTag::Enum {
                values: vec![json!(2), json!(3)],
            },
        );
        assert_eq!(map_ok(&param).entry_type, Some(CanonicalType::Integer));
    }

    #[test]
    fn test_mixed_enum_dropped_with_warning() {
        let mut warnings = Vec::new();
        let param = ParameterSpec::new(
            "level",
            TypeTag::Enum {
                values: vec![json!(1), json!("high")],
            },
        );
        assert_eq!(map_parameter(&param, &mut warnings).unwrap(), None);
        assert_eq!(warnings.len(), 1);

        let empty = ParameterSpec::new("empty", TypeTag::Enum { values: vec![] });
        assert_eq!(map_parameter(&empty, &mut warnings).unwrap(), None);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_range_bounds_and_fallback_default() {
        let param = ParameterSpec::new(
            "threads",
            TypeTag::Range {
                base: RangeBase::Int,
                low: Some(1.0),
                high: Some(40.0),
            },
        );
        let entry = map_ok(&param);
        assert_eq!(entry.entry_type, Some(CanonicalType::Integer));
        assert_eq!(entry.minimum, Some(Number::from(1)));
        assert_eq!(entry.maximum, Some(Number::from(40)));
        // No declared default: the range's own lower bound stands in.
        assert_eq!(entry.default, Some(json!(1)));
    }

    #[test]
    fn test_range_declared_default_wins() {
        let param = ParameterSpec::new(
            "threads",
            TypeTag::Range {
                base: RangeBase::Int,
                low: Some(1.0),
                high: None,
            },
        )
        .default_value(json!(8));
        let entry = map_ok(&param);
        assert_eq!(entry.default, Some(json!(8)));
        assert_eq!(entry.maximum, None);
    }

    #[test]
    fn test_file_and_directory_entries() {
        for tag in [TypeTag::File, TypeTag::Directory] {
            let entry = map_ok(&ParameterSpec::new("moving_image", tag).mandatory());
            assert_eq!(entry.base, Some(FileBase::File));
            assert_eq!(entry.entry_type, None);
            assert!(entry.is_file());
        }
    }

    #[test]
    fn test_multi_path_delegation() {
        let files = ParameterSpec::new(
            "masks",
            TypeTag::MultiPath {
                inner: Box::new(TypeTag::File),
            },
        );
        assert!(map_ok(&files).is_file());

        let texts = ParameterSpec::new(
            "labels",
            TypeTag::MultiPath {
                inner: Box::new(TypeTag::Str),
            },
        );
        assert_eq!(map_ok(&texts).entry_type, Some(CanonicalType::String));

        let mut warnings = Vec::new();
        let bad = ParameterSpec::new(
            "weights",
            TypeTag::MultiPath {
                inner: Box::new(TypeTag::Float),
            },
        );
        assert!(matches!(
            map_parameter(&bad, &mut warnings),
            Err(MapError::UnsupportedMultiPath { .. })
        ));
    }

    #[test]
    fn test_sequences_and_compounds_error() {
        let mut warnings = Vec::new();
        let list = ParameterSpec::new(
            "metric",
            TypeTag::List {
                inner: Box::new(TypeTag::Str),
            },
        );
        match map_parameter(&list, &mut warnings) {
            Err(MapError::UnsupportedSequence { param }) => assert_eq!(param, "metric"),
            other => panic!("unexpected: {:?}", other),
        }

        let compound = ParameterSpec::new(
            "either",
            TypeTag::Compound {
                members: vec![TypeTag::Int, TypeTag::Str],
            },
        );
        assert!(matches!(
            map_parameter(&compound, &mut warnings),
            Err(MapError::UnsupportedCompound { .. })
        ));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let param = ParameterSpec::new("dimension", TypeTag::Int)
            .default_value(json!(3))
            .description("Image dimension");
        let mut w1 = Vec::new();
        let mut w2 = Vec::new();
        assert_eq!(
            map_parameter(&param, &mut w1).unwrap(),
            map_parameter(&param, &mut w2).unwrap()
        );
    }

    #[test]
    fn test_entry_serialization_shape() {
        let entry = map_ok(
            &ParameterSpec::new("dimension", TypeTag::Int)
                .default_value(json!(3))
                .description("Image dimension"),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "integer",
                "description": "Image dimension",
                "default": 3,
                "optional": true
            })
        );
    }
}
