//! The spec-tree value type and its structural merge.
//!
//! Control entries in a spec tree hold free-form scalar / sequence /
//! mapping values that inherit down the tree. [`merge`] folds one node's
//! value onto the inherited one:
//!
//! - empty/absent inherited value: the new value wins
//! - sequence onto sequence: concatenation, order preserved, no dedup
//! - mapping onto mapping: key union, inherited keys first, recursing on
//!   keys present in both
//! - scalar: overrides whatever was inherited

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::MergeError;

/// A closed scalar | sequence | mapping value, order-preserving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeValue {
    /// Absent/null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(Number),
    /// Text scalar.
    String(String),
    /// Ordered sequence.
    Sequence(Vec<TreeValue>),
    /// Ordered mapping.
    Mapping(IndexMap<String, TreeValue>),
}

impl TreeValue {
    /// Returns a short shape name for diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            TreeValue::Null => "null",
            TreeValue::Bool(_) => "bool",
            TreeValue::Number(_) => "number",
            TreeValue::String(_) => "string",
            TreeValue::Sequence(_) => "sequence",
            TreeValue::Mapping(_) => "mapping",
        }
    }

    /// Returns true for null and for empty sequences/mappings.
    pub fn is_empty(&self) -> bool {
        match self {
            TreeValue::Null => true,
            TreeValue::Sequence(seq) => seq.is_empty(),
            TreeValue::Mapping(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Returns the mapping entries, if this value is a mapping.
    pub fn as_mapping(&self) -> Option<&IndexMap<String, TreeValue>> {
        match self {
            TreeValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the sequence items, if this value is a sequence.
    pub fn as_sequence(&self) -> Option<&[TreeValue]> {
        match self {
            TreeValue::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Returns the string value, if this value is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean value, if this value is a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TreeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for TreeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TreeValue::Null,
            serde_json::Value::Bool(b) => TreeValue::Bool(b),
            serde_json::Value::Number(n) => TreeValue::Number(n),
            serde_json::Value::String(s) => TreeValue::String(s),
            serde_json::Value::Array(items) => {
                TreeValue::Sequence(items.into_iter().map(TreeValue::from).collect())
            }
            serde_json::Value::Object(map) => TreeValue::Mapping(
                map.into_iter().map(|(k, v)| (k, TreeValue::from(v))).collect(),
            ),
        }
    }
}

impl From<TreeValue> for serde_json::Value {
    fn from(value: TreeValue) -> Self {
        match value {
            TreeValue::Null => serde_json::Value::Null,
            TreeValue::Bool(b) => serde_json::Value::Bool(b),
            TreeValue::Number(n) => serde_json::Value::Number(n),
            TreeValue::String(s) => serde_json::Value::String(s),
            TreeValue::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            TreeValue::Mapping(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Folds `new` onto `old`, per the merge laws above.
///
/// Sequence-onto-non-sequence and mapping-onto-non-mapping are authoring
/// defects and fail rather than silently replacing the inherited value.
pub fn merge(old: &TreeValue, new: &TreeValue) -> Result<TreeValue, MergeError> {
    if old.is_empty() {
        return Ok(new.clone());
    }
    match new {
        TreeValue::Sequence(new_items) => {
            let old_items = old.as_sequence().ok_or(MergeError::SequenceOntoScalar {
                found: old.shape_name(),
            })?;
            let mut out = old_items.to_vec();
            out.extend(new_items.iter().cloned());
            Ok(TreeValue::Sequence(out))
        }
        TreeValue::Mapping(new_map) => {
            let old_map = old.as_mapping().ok_or(MergeError::MappingOntoScalar {
                found: old.shape_name(),
            })?;
            let mut out = IndexMap::new();
            for key in old_map.keys().chain(new_map.keys()) {
                if out.contains_key(key) {
                    continue;
                }
                let value = match (old_map.get(key), new_map.get(key)) {
                    (Some(old_v), Some(new_v)) => merge(old_v, new_v)?,
                    (Some(old_v), None) => old_v.clone(),
                    (None, Some(new_v)) => new_v.clone(),
                    (None, None) => unreachable!("key comes from one of the maps"),
                };
                out.insert(key.clone(), value);
            }
            Ok(TreeValue::Mapping(out))
        }
        // Scalars (including null) override the inherited value.
        scalar => Ok(scalar.clone()),
    }
}

/// Convenience: folds an optional new value onto an optional inherited one.
pub fn merge_opt(
    old: Option<&TreeValue>,
    new: Option<&TreeValue>,
) -> Result<Option<TreeValue>, MergeError> {
    match (old, new) {
        (None, None) => Ok(None),
        (Some(old), None) => Ok(Some(old.clone())),
        (None, Some(new)) => Ok(Some(new.clone())),
        (Some(old), Some(new)) => merge(old, new).map(Some),
    }
}
