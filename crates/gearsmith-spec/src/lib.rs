//! Gearsmith Canonical Manifest Library
//!
//! This crate turns typed interface descriptors into packaging manifests.
//! It maps parameter descriptors onto a closed canonical schema, composes
//! manifests over a declarative spec tree with inheritable control entries,
//! and resolves runtime call arguments from a manifest plus provided inputs
//! and config.
//!
//! # Overview
//!
//! Three subsystems, used in order:
//!
//! - **Mapper**: one [`ParameterSpec`] in, at most one
//!   [`CanonicalSchemaEntry`] out (see [`schema::map_parameter`])
//! - **Composer**: walks a [`SpecNode`] tree over a [`Registry`], folding
//!   `%`-prefixed control entries down each path and publishing one
//!   [`Manifest`] per materialized interface
//! - **Resolver**: binds a manifest, a caller config, and an input
//!   directory into one ready-to-run [`Invocation`]
//!
//! # Example
//!
//! ```
//! use gearsmith_spec::{
//!     Composer, ComposeOptions, InterfaceDescriptor, Namespace, ParameterSpec,
//!     RecordingSink, Registry, SpecNode, TypeTag,
//! };
//!
//! // Describe one interface and register it.
//! let align = InterfaceDescriptor::new("toolkit.interfaces.registration:Align")
//!     .base("CommandInterface")
//!     .input(ParameterSpec::new("moving_image", TypeTag::File).mandatory())
//!     .input(ParameterSpec::new("dimension", TypeTag::Int));
//! let registration = Namespace::new("toolkit.interfaces.registration")
//!     .interface("Align", align);
//! let interfaces = Namespace::new("toolkit.interfaces")
//!     .namespace("registration", registration);
//! let toolkit = Namespace::new("toolkit").namespace("interfaces", interfaces);
//! let registry = Registry::new().namespace("toolkit", toolkit);
//!
//! // Author a spec tree and compose it.
//! let tree = SpecNode::from_json(r#"{
//!     "%manifest": {"author": "Example Lab"},
//!     "toolkit.interfaces.registration.Align": {}
//! }"#).unwrap();
//!
//! let composer = Composer::new(&registry, ComposeOptions::default());
//! let mut sink = RecordingSink::default();
//! let report = composer.compose(&tree, Some(&mut sink)).unwrap();
//!
//! assert_eq!(report.generated_count(), 1);
//! let manifest = &report.manifests["toolkit.interfaces.registration.Align"];
//! assert_eq!(manifest.name, "Align");
//! assert_eq!(manifest.author.as_deref(), Some("Example Lab"));
//! ```
//!
//! # Modules
//!
//! - [`error`]: error and warning types across all subsystems
//! - [`param`]: typed parameter and interface descriptors
//! - [`value`]: the structural merge value type for control entries
//! - [`registry`]: the namespace tree addressed by spec-tree paths
//! - [`schema`]: descriptor-to-canonical-entry mapping
//! - [`manifest`]: the manifest artifact and its extraction
//! - [`tree`]: spec-tree nodes, control entries, and context folding
//! - [`compose`]: the tree walker and artifact sinks
//! - [`report`]: per-node composition outcomes
//! - [`validation`]: structural manifest validation
//! - [`resolve`]: runtime argument resolution

pub mod compose;
pub mod error;
pub mod manifest;
pub mod param;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod tree;
pub mod validation;
pub mod value;

// Re-export commonly used types at the crate root
pub use compose::{
    artifact_dir, ArtifactSink, ComposeOptions, Composer, DirectorySink, RecordingSink,
    DEFAULT_NOISE_SEGMENTS,
};
pub use error::{
    ComposeError, ErrorCode, MapError, MapWarning, MergeError, PublishError, ResolveError,
    SpecError, ValidationError, ValidationResult, ValidationWarning, WarningCode,
};
pub use manifest::{extract_manifest, ExtractOptions, Manifest, CUSTOM_SECTION};
pub use param::{DefaultKind, InterfaceDescriptor, ParameterSpec, RangeBase, TypeTag};
pub use registry::{Namespace, Registry, RegistryEntry};
pub use report::{ComposeReport, NodeOutcome, NodeStatus, NodeWarning};
pub use resolve::{resolve, Invocation, Resolution, ResolveWarning};
pub use schema::{
    map_parameter, CanonicalSchemaEntry, CanonicalType, FileBase, HELPER_SUFFIX, SKIP_PARAMS,
};
pub use tree::{ComposedContext, IncludePredicate, NodeControls, SpecNode};
pub use validation::validate_manifest;
pub use value::TreeValue;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn neuro_registry() -> Registry {
        let align = InterfaceDescriptor::new("toolkit.interfaces.registration:Align")
            .base("CommandInterface")
            .doc("Rigid and deformable image registration.")
            .input(ParameterSpec::new("fixed_image", TypeTag::File).mandatory())
            .input(ParameterSpec::new("moving_image", TypeTag::File).mandatory())
            .input(
                ParameterSpec::new(
                    "transform",
                    TypeTag::Enum {
                        values: vec![json!("SyN"), json!("Affine"), json!("Rigid")],
                    },
                )
                .default_value(json!("SyN")),
            )
            .input(
                ParameterSpec::new("dimension", TypeTag::Int)
                    .default_value(json!(3))
                    .description("image dimension (2 or 3)"),
            )
            .input(ParameterSpec::new("moving_image_mask", TypeTag::File))
            .output(ParameterSpec::new("warped_image", TypeTag::File));
        let registration =
            Namespace::new("toolkit.interfaces.registration").interface("Align", align);
        let interfaces =
            Namespace::new("toolkit.interfaces").namespace("registration", registration);
        let toolkit = Namespace::new("toolkit").namespace("interfaces", interfaces);
        Registry::new().namespace("toolkit", toolkit)
    }

    /// End to end: compose a manifest from a spec tree, then resolve call
    /// arguments for it from an input directory.
    #[test]
    fn test_compose_then_resolve() {
        let registry = neuro_registry();
        let tree = SpecNode::from_json(
            r#"{
                "%manifest": {
                    "author": "Example Lab",
                    "license": "Apache-2.0"
                },
                "%params": {"preferred_prefix": "fixed_"},
                "toolkit.interfaces.registration.Align": {}
            }"#,
        )
        .unwrap();

        let composer = Composer::new(&registry, ComposeOptions::default());
        let mut sink = RecordingSink::default();
        let report = composer.compose(&tree, Some(&mut sink)).unwrap();
        assert_eq!(report.generated_count(), 1, "outcomes: {:?}", report.outcomes);

        let manifest = &report.manifests["toolkit.interfaces.registration.Align"];
        assert_eq!(manifest.author.as_deref(), Some("Example Lab"));

        // File-likes land in inputs, the rest in config.
        assert!(manifest.inputs.contains_key("fixed_image"));
        assert!(manifest.inputs.contains_key("moving_image_mask"));
        assert!(manifest.config.contains_key("transform"));
        assert!(manifest.config.contains_key("dimension"));

        // The enum became a typed entry with its allowed values.
        let transform = &manifest.config["transform"];
        assert_eq!(transform.entry_type, Some(CanonicalType::String));
        assert_eq!(
            transform.allowed,
            Some(vec![json!("SyN"), json!("Affine"), json!("Rigid")])
        );

        // Validation accepts the composed artifact.
        let result = validate_manifest(manifest);
        assert!(result.is_ok(), "errors: {:?}", result.errors);

        // Resolve against a populated input directory.
        let dir = tempfile::tempdir().unwrap();
        for input in ["fixed_image", "moving_image"] {
            let sub = dir.path().join(input);
            std::fs::create_dir_all(&sub).unwrap();
            std::fs::write(sub.join("scan.nii.gz"), b"").unwrap();
        }
        let mut config = IndexMap::new();
        config.insert("dimension".to_string(), json!(2));

        let resolution =
            resolve(manifest, &registry, dir.path(), &dir.path().join("output"), &config).unwrap();
        assert!(resolution.warnings.is_empty());
        let args = &resolution.invocation.arguments;
        assert_eq!(args["dimension"], json!(2));
        assert_eq!(args["transform"], json!("SyN"));
        assert!(args["fixed_image"].as_str().unwrap().ends_with("scan.nii.gz"));
        assert!(!args.contains_key("moving_image_mask"));
    }

    /// Manifests survive a JSON round trip with section order intact.
    #[test]
    fn test_manifest_round_trip() {
        let registry = neuro_registry();
        let tree =
            SpecNode::from_json(r#"{"toolkit.interfaces.registration.Align": {}}"#).unwrap();
        let composer = Composer::new(&registry, ComposeOptions::default());
        let mut sink = RecordingSink::default();
        let report = composer.compose(&tree, Some(&mut sink)).unwrap();

        let manifest = &report.manifests["toolkit.interfaces.registration.Align"];
        let json = manifest.to_json_pretty().unwrap();
        let parsed = Manifest::from_json(&json).unwrap();
        assert_eq!(manifest, &parsed);
        let keys: Vec<_> = parsed.config.keys().collect();
        let original: Vec<_> = manifest.config.keys().collect();
        assert_eq!(keys, original);
    }
}
