//! The declarative spec tree consumed by the composer.
//!
//! A tree is authored as nested JSON objects. Keys starting with `%` are
//! control entries (`%include`, `%manifest`, `%params`, `%recurse`,
//! `%root`); every other key names a child node and is a dotted path
//! fragment relative to the parent. Control entries inherit down the tree
//! through the structural merge in [`crate::value`].

use indexmap::IndexMap;
use regex::Regex;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MergeError;
use crate::registry::RegistryEntry;
use crate::value::{merge_opt, TreeValue};

/// Declarative stand-in for the include filter: decides whether a resolved
/// object should be materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludePredicate {
    /// Accept leaf interfaces only.
    IsInterface,
    /// Accept interfaces whose base/category equals the given name.
    BaseIs(String),
    /// Accept entries whose name matches the given regular expression.
    NameMatches(String),
}

impl IncludePredicate {
    /// Evaluates the predicate against a resolved registry entry.
    pub fn matches(&self, entry: &RegistryEntry) -> bool {
        match self {
            IncludePredicate::IsInterface => entry.as_interface().is_some(),
            IncludePredicate::BaseIs(base) => entry
                .as_interface()
                .is_some_and(|desc| desc.base.as_deref() == Some(base)),
            IncludePredicate::NameMatches(pattern) => {
                let name = match entry {
                    RegistryEntry::Namespace(ns) => ns.name.as_str(),
                    RegistryEntry::Interface(desc) => desc.identity.as_str(),
                };
                Regex::new(pattern)
                    .map(|re| re.is_match(name))
                    .unwrap_or(false)
            }
        }
    }
}

/// Control entries of one spec-tree node. All optional; absent entries
/// inherit from ancestors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeControls {
    /// `%include`: predicate deciding whether to materialize resolved
    /// objects.
    pub include: Option<IncludePredicate>,
    /// `%manifest`: manifest metadata field overrides.
    pub manifest: Option<TreeValue>,
    /// `%params`: keyword overrides for extraction and packaging.
    pub params: Option<TreeValue>,
    /// `%recurse`: auto-discover namespace attributes as implicit children.
    pub recurse: Option<bool>,
    /// `%root`: namespace path anchor; allowed once per root-to-leaf chain.
    pub root: Option<String>,
}

impl NodeControls {
    /// Returns true if no control entry is set.
    pub fn is_empty(&self) -> bool {
        self.include.is_none()
            && self.manifest.is_none()
            && self.params.is_none()
            && self.recurse.is_none()
            && self.root.is_none()
    }
}

/// One addressable node of the spec tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecNode {
    /// Control entries declared at this node.
    pub controls: NodeControls,
    /// Named children, in authored order.
    pub children: IndexMap<String, SpecNode>,
}

impl SpecNode {
    /// Parses a spec tree from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Serialize for SpecNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(include) = &self.controls.include {
            map.serialize_entry("%include", include)?;
        }
        if let Some(manifest) = &self.controls.manifest {
            map.serialize_entry("%manifest", manifest)?;
        }
        if let Some(params) = &self.controls.params {
            map.serialize_entry("%params", params)?;
        }
        if let Some(recurse) = self.controls.recurse {
            map.serialize_entry("%recurse", &recurse)?;
        }
        if let Some(root) = &self.controls.root {
            map.serialize_entry("%root", root)?;
        }
        for (key, child) in &self.children {
            map.serialize_entry(key, child)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SpecNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = SpecNode;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a spec-tree node object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SpecNode, A::Error> {
                let mut node = SpecNode::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "%include" => {
                            let predicate = map.next_value::<IncludePredicate>()?;
                            if let IncludePredicate::NameMatches(pattern) = &predicate {
                                Regex::new(pattern).map_err(|e| {
                                    de::Error::custom(format!(
                                        "invalid %include pattern '{}': {}",
                                        pattern, e
                                    ))
                                })?;
                            }
                            node.controls.include = Some(predicate);
                        }
                        "%manifest" => {
                            node.controls.manifest = Some(map.next_value::<TreeValue>()?);
                        }
                        "%params" => {
                            node.controls.params = Some(map.next_value::<TreeValue>()?);
                        }
                        "%recurse" => {
                            node.controls.recurse = Some(map.next_value::<bool>()?);
                        }
                        "%root" => {
                            node.controls.root = Some(map.next_value::<String>()?);
                        }
                        other if other.starts_with('%') => {
                            return Err(de::Error::custom(format!(
                                "unknown control entry '{}'",
                                other
                            )));
                        }
                        _ => {
                            let child = map.next_value::<SpecNode>()?;
                            node.children.insert(key, child);
                        }
                    }
                }
                Ok(node)
            }
        }

        deserializer.deserialize_map(NodeVisitor)
    }
}

/// The merged control state in effect at one tree node.
///
/// Recomputed per traversal step by folding each node's controls onto the
/// parent context; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ComposedContext {
    /// Effective include predicate.
    pub include: Option<IncludePredicate>,
    /// Merged `%manifest` overrides.
    pub manifest: Option<TreeValue>,
    /// Merged `%params` overrides.
    pub params: Option<TreeValue>,
    /// Effective recursion flag.
    pub recurse: bool,
    /// Effective root anchor, if any ancestor (or this node) declared one.
    pub root: Option<String>,
}

impl ComposedContext {
    /// Folds one node's control entries onto this context.
    ///
    /// `%manifest` and `%params` merge structurally; `%include` and
    /// `%recurse` are scalars and override. `%root` is handled by the
    /// walker (anchoring is positional, not inherited state).
    pub fn fold(&self, controls: &NodeControls) -> Result<ComposedContext, MergeError> {
        Ok(ComposedContext {
            include: controls.include.clone().or_else(|| self.include.clone()),
            manifest: merge_opt(self.manifest.as_ref(), controls.manifest.as_ref())?,
            params: merge_opt(self.params.as_ref(), controls.params.as_ref())?,
            recurse: controls.recurse.unwrap_or(self.recurse),
            root: self.root.clone(),
        })
    }

    /// Returns the merged `%manifest` overrides as a mapping.
    pub fn manifest_fields(&self) -> IndexMap<String, TreeValue> {
        self.manifest
            .as_ref()
            .and_then(TreeValue::as_mapping)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the merged `%params` overrides as a mapping.
    pub fn params_map(&self) -> IndexMap<String, TreeValue> {
        self.params
            .as_ref()
            .and_then(TreeValue::as_mapping)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::InterfaceDescriptor;
    use crate::registry::Namespace;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_tree() {
        let tree = SpecNode::from_json(
            r#"{
                "%manifest": {"author": "A. Uthor", "license": "BSD-3-Clause"},
                "%params": {"preferred_prefix": "out_"},
                "toolkit.interfaces": {
                    "%include": {"base_is": "CommandInterface"},
                    "registration": {
                        "%recurse": true,
                        "Align": {
                            "%manifest": {"label": "Toolkit Align"}
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(tree.controls.manifest.is_some());
        assert!(tree.controls.include.is_none());
        let interfaces = &tree.children["toolkit.interfaces"];
        assert_eq!(
            interfaces.controls.include,
            Some(IncludePredicate::BaseIs("CommandInterface".into()))
        );
        let registration = &interfaces.children["registration"];
        assert_eq!(registration.controls.recurse, Some(true));
        assert!(registration.children.contains_key("Align"));
    }

    #[test]
    fn test_parse_rejects_unknown_control() {
        let err = SpecNode::from_json(r#"{"%exclude": true}"#).unwrap_err();
        assert!(err.to_string().contains("%exclude"));
    }

    #[test]
    fn test_parse_rejects_bad_pattern() {
        let err =
            SpecNode::from_json(r#"{"%include": {"name_matches": "["}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid %include pattern"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let json = r#"{
            "%recurse": true,
            "a": {"%params": {"deb_packages": ["x"]}},
            "b": {}
        }"#;
        let tree = SpecNode::from_json(json).unwrap();
        let text = serde_json::to_string(&tree).unwrap();
        let back = SpecNode::from_json(&text).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_fold_merges_params_sequences() {
        let parent = ComposedContext {
            params: Some(TreeValue::from(json!({"deb_packages": ["a"]}))),
            ..Default::default()
        };
        let controls = NodeControls {
            params: Some(TreeValue::from(json!({"deb_packages": ["b"]}))),
            ..Default::default()
        };
        let folded = parent.fold(&controls).unwrap();
        assert_eq!(
            folded.params,
            Some(TreeValue::from(json!({"deb_packages": ["a", "b"]})))
        );
    }

    #[test]
    fn test_fold_scalar_controls_override() {
        let parent = ComposedContext {
            include: Some(IncludePredicate::IsInterface),
            recurse: false,
            ..Default::default()
        };
        let controls = NodeControls {
            include: Some(IncludePredicate::BaseIs("CommandInterface".into())),
            recurse: Some(true),
            ..Default::default()
        };
        let folded = parent.fold(&controls).unwrap();
        assert_eq!(
            folded.include,
            Some(IncludePredicate::BaseIs("CommandInterface".into()))
        );
        assert!(folded.recurse);

        // Absent controls inherit.
        let folded = folded.fold(&NodeControls::default()).unwrap();
        assert!(folded.recurse);
    }

    #[test]
    fn test_include_predicate_matching() {
        let iface = RegistryEntry::Interface(
            InterfaceDescriptor::new("toolkit.registration:Align").base("CommandInterface"),
        );
        let ns = RegistryEntry::Namespace(Namespace::new("toolkit.registration"));

        assert!(IncludePredicate::IsInterface.matches(&iface));
        assert!(!IncludePredicate::IsInterface.matches(&ns));
        assert!(IncludePredicate::BaseIs("CommandInterface".into()).matches(&iface));
        assert!(!IncludePredicate::BaseIs("Workflow".into()).matches(&iface));
        assert!(IncludePredicate::NameMatches("Align$".into()).matches(&iface));
        assert!(IncludePredicate::NameMatches("registration".into()).matches(&ns));
    }
}
