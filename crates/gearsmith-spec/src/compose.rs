//! The spec tree composer.
//!
//! Walks a [`SpecNode`] tree depth-first pre-order, folds control entries
//! down each path, resolves addressed objects in the registry, and builds
//! one [`Manifest`] per materialized node. All generation failures are
//! node-scoped; only structural authoring defects abort the traversal.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{ComposeError, PublishError};
use crate::manifest::{extract_manifest, ExtractOptions, Manifest};
use crate::registry::{Namespace, Registry, RegistryEntry};
use crate::report::ComposeReport;
use crate::tree::{ComposedContext, SpecNode};
use crate::validation::validate_manifest;
use crate::value::TreeValue;

/// Namespace segments removed when deriving a node's artifact directory:
/// they add no disambiguating value to the output layout.
pub const DEFAULT_NOISE_SEGMENTS: &[&str] = &["interfaces", "preprocess", "registration"];

/// Derives the artifact directory for a dotted node path, dropping the
/// given noise segments.
pub fn artifact_dir(path: &str, noise_segments: &[String]) -> PathBuf {
    path.split('.')
        .filter(|segment| !noise_segments.iter().any(|n| n == segment))
        .collect()
}

/// Receiver for materialized artifacts, one call per processed node.
///
/// Packaging-format specifics (container descriptors, launcher scripts,
/// builds) live behind this boundary; the composer only needs success or
/// a failure it can record against the node.
pub trait ArtifactSink {
    /// Publishes one node's manifest.
    ///
    /// `artifact_dir` is the node's derived directory, relative to the
    /// sink's own root. `params` are the composed `%params` not consumed
    /// by extraction (packaging hints such as package lists).
    fn publish(
        &mut self,
        artifact_dir: &Path,
        manifest: &Manifest,
        params: &IndexMap<String, TreeValue>,
    ) -> Result<(), PublishError>;
}

/// Sink writing `manifest.json` per node under a root directory,
/// validating each manifest before it is written.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    validate: bool,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`, with validation on.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            validate: true,
        }
    }

    /// Disables pre-publication validation.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

impl ArtifactSink for DirectorySink {
    fn publish(
        &mut self,
        artifact_dir: &Path,
        manifest: &Manifest,
        _params: &IndexMap<String, TreeValue>,
    ) -> Result<(), PublishError> {
        if self.validate {
            let result = validate_manifest(manifest);
            if !result.is_ok() {
                return Err(PublishError::Validation {
                    count: result.errors.len(),
                    first: result.errors[0].to_string(),
                });
            }
        }
        let dir = self.root.join(artifact_dir);
        fs::create_dir_all(&dir)?;
        let text = manifest.to_json_pretty()?;
        fs::write(dir.join("manifest.json"), text)?;
        Ok(())
    }
}

/// Recording sink for tests and dry runs: keeps every publication in
/// memory and never touches the filesystem.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Everything published so far, in traversal order.
    pub records: Vec<(PathBuf, Manifest, IndexMap<String, TreeValue>)>,
}

impl ArtifactSink for RecordingSink {
    fn publish(
        &mut self,
        artifact_dir: &Path,
        manifest: &Manifest,
        params: &IndexMap<String, TreeValue>,
    ) -> Result<(), PublishError> {
        self.records
            .push((artifact_dir.to_path_buf(), manifest.clone(), params.clone()));
        Ok(())
    }
}

/// Options controlling one composition run.
#[derive(Debug)]
pub struct ComposeOptions {
    /// Whether to materialize manifests at all (false = traversal dry
    /// run).
    pub generate: bool,

    /// Only process nodes whose full dotted path matches; others are
    /// soft-skipped (children still traversed).
    pub path_filter: Option<Regex>,

    /// Namespace segments removed from artifact directories.
    pub noise_segments: Vec<String>,

    /// Version string stamped into every manifest unless overridden.
    pub version: Option<String>,

    /// Suffix manifest names/versions with `-dummy`.
    pub dummy: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            generate: true,
            path_filter: None,
            noise_segments: DEFAULT_NOISE_SEGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            version: None,
            dummy: false,
        }
    }
}

/// The spec tree composer.
pub struct Composer<'a> {
    registry: &'a Registry,
    options: ComposeOptions,
}

impl<'a> Composer<'a> {
    /// Creates a composer over the given registry.
    pub fn new(registry: &'a Registry, options: ComposeOptions) -> Self {
        Self { registry, options }
    }

    /// Composes the whole tree, publishing through `sink` when one is
    /// supplied. Without a sink, every processable node is skipped with
    /// reason "output" (nothing would be saved).
    pub fn compose(
        &self,
        tree: &SpecNode,
        mut sink: Option<&mut dyn ArtifactSink>,
    ) -> Result<ComposeReport, ComposeError> {
        let mut report = ComposeReport::new();
        self.walk(
            tree,
            "",
            "",
            None,
            &ComposedContext::default(),
            &mut sink,
            &mut report,
        )?;
        Ok(report)
    }

    /// Derives the artifact directory for a node path using this
    /// composer's noise segments.
    pub fn artifact_dir(&self, path: &str) -> PathBuf {
        artifact_dir(path, &self.options.noise_segments)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        node: &SpecNode,
        key: &str,
        parent_path: &str,
        parent_ns: Option<&Namespace>,
        parent_ctx: &ComposedContext,
        sink: &mut Option<&mut dyn ArtifactSink>,
        report: &mut ComposeReport,
    ) -> Result<(), ComposeError> {
        // Root anchoring is positional: it may only happen before any path
        // has accumulated, and only once per chain.
        let mut full_path = join_path(parent_path, key);
        if let Some(root) = &node.controls.root {
            if parent_ctx.root.is_some() || !full_path.is_empty() {
                return Err(ComposeError::ConflictingRoot {
                    path: if full_path.is_empty() {
                        root.clone()
                    } else {
                        full_path
                    },
                });
            }
            full_path = root.clone();
        }

        let mut ctx = parent_ctx
            .fold(&node.controls)
            .map_err(|source| ComposeError::Merge {
                path: full_path.clone(),
                source,
            })?;
        if node.controls.root.is_some() {
            ctx.root = node.controls.root.clone();
        }

        let resolved = if full_path.is_empty() {
            None
        } else {
            let entry = match parent_ns {
                Some(ns) => ns.resolve(key),
                None => self.registry.resolve(&full_path),
            };
            if entry.is_none() {
                report.failed(&full_path, format!("'{}' not found in registry", full_path));
            }
            entry
        };

        if let Some(entry) = resolved {
            self.process(entry, &full_path, &ctx, sink, report);
        }

        // Children: explicit ones in authored order, then auto-discovered
        // namespace attributes when recursion is composed in. Explicit
        // children are never overridden by discovery.
        let mut children: Vec<(&str, &SpecNode)> = node
            .children
            .iter()
            .map(|(k, child)| (k.as_str(), child))
            .collect();

        let implicit = SpecNode::default();
        let current_ns = resolved.and_then(RegistryEntry::as_namespace);
        if ctx.recurse {
            if let Some(ns) = current_ns {
                for attr in ns.public_keys() {
                    if node.children.contains_key(attr) {
                        continue;
                    }
                    let keep = match &ns.entries[attr] {
                        RegistryEntry::Namespace(sub) => ns.contains_by_name(sub),
                        RegistryEntry::Interface(_) => true,
                    };
                    if keep {
                        children.push((attr, &implicit));
                    }
                }
            }
        }

        for (child_key, child) in children {
            self.walk(child, child_key, &full_path, current_ns, &ctx, sink, report)?;
        }
        Ok(())
    }

    /// Decides one resolved node's fate: soft-skip, manifest generation,
    /// or a recorded node-scoped failure.
    fn process(
        &self,
        entry: &RegistryEntry,
        path: &str,
        ctx: &ComposedContext,
        sink: &mut Option<&mut dyn ArtifactSink>,
        report: &mut ComposeReport,
    ) {
        if let Some(filter) = &self.options.path_filter {
            if !filter.is_match(path) {
                report.skipped(path, "regex");
                return;
            }
        }
        if let Some(predicate) = &ctx.include {
            if !predicate.matches(entry) {
                report.skipped(path, "%include");
                return;
            }
        }
        if !self.options.generate {
            report.skipped(path, "generate");
            return;
        }
        let descriptor = match entry.as_interface() {
            Some(descriptor) => descriptor,
            // Namespaces are traversal waypoints, not manifests.
            None => {
                report.skipped(path, "namespace");
                return;
            }
        };
        let sink = match sink.as_deref_mut() {
            Some(sink) => sink,
            None => {
                report.skipped(path, "output");
                return;
            }
        };

        let params = ctx.params_map();
        let mut options = ExtractOptions::from_params(&params);
        options.version = self.options.version.clone();
        options.dummy = self.options.dummy;

        match extract_manifest(descriptor, &ctx.manifest_fields(), &options) {
            Ok((manifest, warnings)) => {
                report.add_warnings(path, warnings);
                match sink.publish(&self.artifact_dir(path), &manifest, &params) {
                    Ok(()) => report.generated(path, manifest),
                    Err(err) => report.failed(path, err),
                }
            }
            Err(err) => report.failed(path, err),
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else if key.is_empty() {
        parent.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{InterfaceDescriptor, ParameterSpec, TypeTag};
    use crate::report::NodeStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn align() -> InterfaceDescriptor {
        InterfaceDescriptor::new("toolkit.interfaces.registration:Align")
            .base("CommandInterface")
            .input(ParameterSpec::new("moving_image", TypeTag::File).mandatory())
            .input(ParameterSpec::new("dimension", TypeTag::Int).default_value(json!(3)))
    }

    fn extract_brain() -> InterfaceDescriptor {
        InterfaceDescriptor::new("toolkit.interfaces.segmentation:ExtractBrain")
            .base("CommandInterface")
            .input(ParameterSpec::new("in_file", TypeTag::File).mandatory())
    }

    fn broken() -> InterfaceDescriptor {
        InterfaceDescriptor::new("toolkit.interfaces.registration:Warp")
            .base("CommandInterface")
            .input(ParameterSpec::new(
                "metric",
                TypeTag::List {
                    inner: Box::new(TypeTag::Str),
                },
            ))
    }

    fn sample_registry() -> Registry {
        let registration = Namespace::new("toolkit.interfaces.registration")
            .interface("Align", align())
            .interface("Warp", broken());
        let segmentation = Namespace::new("toolkit.interfaces.segmentation")
            .interface("ExtractBrain", extract_brain());
        let interfaces = Namespace::new("toolkit.interfaces")
            .namespace("registration", registration)
            .namespace("segmentation", segmentation)
            // Reachable by reference but not nested by name; recursion
            // must not wander into it.
            .namespace("foreign", Namespace::new("othertool.plugins"));
        let toolkit = Namespace::new("toolkit").namespace("interfaces", interfaces);
        Registry::new().namespace("toolkit", toolkit)
    }

    fn compose_with_sink(
        tree_json: &str,
        options: ComposeOptions,
    ) -> (ComposeReport, RecordingSink) {
        let registry = sample_registry();
        let tree = SpecNode::from_json(tree_json).unwrap();
        let composer = Composer::new(&registry, options);
        let mut sink = RecordingSink::default();
        let report = composer.compose(&tree, Some(&mut sink)).unwrap();
        (report, sink)
    }

    #[test]
    fn test_compose_single_interface() {
        let (report, sink) = compose_with_sink(
            r#"{"toolkit.interfaces.registration.Align": {}}"#,
            ComposeOptions::default(),
        );
        assert_eq!(report.generated_count(), 1);
        assert!(report
            .manifests
            .contains_key("toolkit.interfaces.registration.Align"));
        assert_eq!(sink.records.len(), 1);
        // Noise segments dropped from the artifact directory.
        assert_eq!(sink.records[0].0, PathBuf::from("toolkit/Align"));
    }

    #[test]
    fn test_params_merge_down_the_tree() {
        let (_, sink) = compose_with_sink(
            r#"{
                "%params": {"deb_packages": ["a"]},
                "toolkit.interfaces.registration": {
                    "%params": {"deb_packages": ["b"]},
                    "Align": {}
                }
            }"#,
            ComposeOptions::default(),
        );
        let (_, _, params) = &sink.records[0];
        assert_eq!(
            params["deb_packages"],
            TreeValue::from(json!(["a", "b"]))
        );
    }

    #[test]
    fn test_manifest_fields_inherit_and_override() {
        let (report, _) = compose_with_sink(
            r#"{
                "%manifest": {"author": "A. Uthor", "license": "BSD-3-Clause"},
                "toolkit.interfaces.registration.Align": {
                    "%manifest": {"license": "Other"}
                }
            }"#,
            ComposeOptions::default(),
        );
        let manifest = &report.manifests["toolkit.interfaces.registration.Align"];
        assert_eq!(manifest.author.as_deref(), Some("A. Uthor"));
        assert_eq!(manifest.license.as_deref(), Some("Other"));
    }

    #[test]
    fn test_include_predicate_skips_namespaces() {
        let (report, _) = compose_with_sink(
            r#"{
                "%include": {"base_is": "CommandInterface"},
                "toolkit.interfaces": {
                    "registration": {"Align": {}}
                }
            }"#,
            ComposeOptions::default(),
        );
        // The two namespace waypoints are predicate-skipped; the leaf
        // generates.
        assert_eq!(report.generated_count(), 1);
        assert_eq!(report.skipped_count(), 2);
        for outcome in &report.outcomes {
            if let NodeStatus::Skipped { reason } = &outcome.status {
                assert_eq!(reason, "%include");
            }
        }
    }

    #[test]
    fn test_regex_filter_soft_skips() {
        let options = ComposeOptions {
            path_filter: Some(Regex::new("Align").unwrap()),
            ..Default::default()
        };
        let (report, _) = compose_with_sink(
            r#"{
                "toolkit.interfaces.registration": {"Align": {}},
                "toolkit.interfaces.segmentation": {"ExtractBrain": {}}
            }"#,
            options,
        );
        assert_eq!(report.generated_count(), 1);
        assert!(report.manifests.contains_key("toolkit.interfaces.registration.Align"));
        let skipped: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| matches!(&o.status, NodeStatus::Skipped { reason } if reason == "regex"))
            .collect();
        assert_eq!(skipped.len(), 3);
    }

    #[test]
    fn test_recursion_discovers_interfaces() {
        let (report, _) = compose_with_sink(
            r#"{
                "%include": "is_interface",
                "toolkit.interfaces.registration": {"%recurse": true}
            }"#,
            ComposeOptions::default(),
        );
        assert!(report.manifests.contains_key("toolkit.interfaces.registration.Align"));
        // Warp is discovered too but fails on its unsupported parameter.
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_recursion_respects_namespace_guard() {
        let (report, _) = compose_with_sink(
            r#"{"toolkit.interfaces": {"%recurse": true}}"#,
            ComposeOptions::default(),
        );
        // `foreign` points at a namespace not nested under
        // toolkit.interfaces by name, so nothing under it is visited.
        assert!(report
            .outcomes
            .iter()
            .all(|o| !o.path.contains("foreign")));
        // Nested namespaces are visited and recursed into.
        assert!(report.manifests.contains_key("toolkit.interfaces.registration.Align"));
        assert!(report
            .manifests
            .contains_key("toolkit.interfaces.segmentation.ExtractBrain"));
    }

    #[test]
    fn test_explicit_children_not_overridden_by_discovery() {
        let (report, _) = compose_with_sink(
            r#"{
                "toolkit.interfaces.registration": {
                    "%recurse": true,
                    "Align": {"%manifest": {"label": "Custom Align"}}
                }
            }"#,
            ComposeOptions::default(),
        );
        let manifest = &report.manifests["toolkit.interfaces.registration.Align"];
        assert_eq!(manifest.label.as_deref(), Some("Custom Align"));
    }

    #[test]
    fn test_unsupported_parameter_is_node_scoped() {
        let (report, _) = compose_with_sink(
            r#"{
                "toolkit.interfaces.registration": {
                    "Warp": {},
                    "Align": {}
                }
            }"#,
            ComposeOptions::default(),
        );
        assert_eq!(report.failed_count(), 1);
        // The sibling still generates.
        assert!(report.manifests.contains_key("toolkit.interfaces.registration.Align"));
        let failed = report
            .outcomes
            .iter()
            .find(|o| matches!(o.status, NodeStatus::Failed { .. }))
            .unwrap();
        assert_eq!(failed.path, "toolkit.interfaces.registration.Warp");
        if let NodeStatus::Failed { error } = &failed.status {
            assert!(error.contains("metric"));
        }
    }

    #[test]
    fn test_unknown_path_is_node_scoped() {
        let (report, _) = compose_with_sink(
            r#"{
                "toolkit.interfaces.morphometry.Thickness": {},
                "toolkit.interfaces.registration.Align": {}
            }"#,
            ComposeOptions::default(),
        );
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.generated_count(), 1);
    }

    #[test]
    fn test_no_sink_skips_with_output_reason() {
        let registry = sample_registry();
        let tree =
            SpecNode::from_json(r#"{"toolkit.interfaces.registration.Align": {}}"#).unwrap();
        let composer = Composer::new(&registry, ComposeOptions::default());
        let report = composer.compose(&tree, None).unwrap();
        assert_eq!(report.generated_count(), 0);
        assert!(matches!(
            &report.outcomes[0].status,
            NodeStatus::Skipped { reason } if reason == "output"
        ));
    }

    #[test]
    fn test_generate_disabled_skips() {
        let options = ComposeOptions {
            generate: false,
            ..Default::default()
        };
        let (report, sink) =
            compose_with_sink(r#"{"toolkit.interfaces.registration.Align": {}}"#, options);
        assert_eq!(report.generated_count(), 0);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_root_anchor() {
        let (report, _) = compose_with_sink(
            r#"{
                "%root": "toolkit.interfaces",
                "registration.Align": {}
            }"#,
            ComposeOptions::default(),
        );
        assert!(report.manifests.contains_key("toolkit.interfaces.registration.Align"));
    }

    #[test]
    fn test_conflicting_root_aborts() {
        let registry = sample_registry();
        let tree = SpecNode::from_json(
            r#"{
                "%root": "toolkit",
                "interfaces": {"%root": "toolkit.interfaces"}
            }"#,
        )
        .unwrap();
        let composer = Composer::new(&registry, ComposeOptions::default());
        let err = composer.compose(&tree, None).unwrap_err();
        assert!(matches!(err, ComposeError::ConflictingRoot { .. }));
    }

    #[test]
    fn test_merge_shape_mismatch_aborts() {
        let registry = sample_registry();
        let tree = SpecNode::from_json(
            r#"{
                "%params": {"deb_packages": "ants"},
                "toolkit.interfaces.registration.Align": {
                    "%params": {"deb_packages": ["ants"]}
                }
            }"#,
        )
        .unwrap();
        let composer = Composer::new(&registry, ComposeOptions::default());
        let err = composer.compose(&tree, None).unwrap_err();
        assert!(matches!(err, ComposeError::Merge { .. }));
    }

    #[test]
    fn test_directory_sink_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = sample_registry();
        let tree =
            SpecNode::from_json(r#"{"toolkit.interfaces.registration.Align": {}}"#).unwrap();
        let composer = Composer::new(&registry, ComposeOptions::default());
        let mut sink = DirectorySink::new(dir.path());
        let report = composer.compose(&tree, Some(&mut sink)).unwrap();
        assert_eq!(report.generated_count(), 1);

        let manifest_path = dir.path().join("toolkit/Align/manifest.json");
        let text = fs::read_to_string(manifest_path).unwrap();
        let manifest = Manifest::from_json(&text).unwrap();
        assert_eq!(manifest.name, "Align");
        assert_eq!(
            manifest.interface_identity(),
            "toolkit.interfaces.registration:Align"
        );
    }
}
