//! Typed parameter descriptors, as exposed by the introspection boundary.
//!
//! A [`ParameterSpec`] is one declared parameter of an interface; an
//! [`InterfaceDescriptor`] is the full identity of an interface class plus
//! its ordered input and output parameter collections. Both are read-only
//! once introspected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base type of a bounded-range validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBase {
    /// Integer-valued range.
    Int,
    /// Floating-point-valued range.
    Float,
}

/// Runtime type tag of one parameter.
///
/// This is a closed enum over exactly the parameter shapes the packaging
/// target understands. Shapes with no representation (`List`, `Tuple`,
/// `Compound`) are explicit variants so the mapper can reject them with the
/// parameter name rather than fail a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeTag {
    /// Plain integer.
    Int,
    /// Floating-point number.
    Float,
    /// Boolean flag.
    Bool,
    /// Free text.
    Str,
    /// One of a fixed set of literal values.
    Enum {
        /// The allowed literal values, in declaration order.
        values: Vec<Value>,
    },
    /// Numeric value constrained to a range.
    Range {
        /// Base type of the bound validator.
        base: RangeBase,
        /// Lower bound, if not unbounded.
        #[serde(skip_serializing_if = "Option::is_none")]
        low: Option<f64>,
        /// Upper bound, if not unbounded.
        #[serde(skip_serializing_if = "Option::is_none")]
        high: Option<f64>,
    },
    /// Homogeneous list of an inner type. Unsupported by the mapper.
    List {
        /// The inner element type.
        inner: Box<TypeTag>,
    },
    /// Fixed-arity tuple. Unsupported by the mapper.
    Tuple {
        /// The member types.
        members: Vec<TypeTag>,
    },
    /// A single input or output file.
    File,
    /// A directory, treated identically to a single file for schema purposes.
    Directory,
    /// Multiple path-like values of one uniform inner type.
    MultiPath {
        /// The inner element type; must be file-like or text-like.
        inner: Box<TypeTag>,
    },
    /// Union of several alternative shapes. Unsupported by the mapper.
    Compound {
        /// The alternative types.
        members: Vec<TypeTag>,
    },
}

impl TypeTag {
    /// Returns a short shape name for diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Str => "str",
            TypeTag::Enum { .. } => "enum",
            TypeTag::Range { .. } => "range",
            TypeTag::List { .. } => "list",
            TypeTag::Tuple { .. } => "tuple",
            TypeTag::File => "file",
            TypeTag::Directory => "directory",
            TypeTag::MultiPath { .. } => "multi_path",
            TypeTag::Compound { .. } => "compound",
        }
    }

    /// Returns true for file-like shapes (`File` and `Directory`).
    pub fn is_file_like(&self) -> bool {
        matches!(self, TypeTag::File | TypeTag::Directory)
    }
}

/// How a parameter's default value is stored by the source type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    /// A plain literal value.
    #[default]
    Value,
    /// Produced by a factory/callable at instantiation time.
    Computed,
}

/// One declared parameter of an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,

    /// Runtime type tag.
    pub tag: TypeTag,

    /// Whether the parameter must be supplied.
    #[serde(default)]
    pub mandatory: bool,

    /// Default value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Storage kind of the default value.
    #[serde(default)]
    pub default_kind: DefaultKind,

    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Names of mutually exclusive peer parameters; at most one of the
    /// group may be set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xor: Vec<String>,
}

impl ParameterSpec {
    /// Creates a new parameter spec with the given name and type tag.
    pub fn new(name: impl Into<String>, tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            tag,
            mandatory: false,
            default: None,
            default_kind: DefaultKind::Value,
            description: None,
            xor: Vec::new(),
        }
    }

    /// Marks the parameter as mandatory.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the storage kind of the default value.
    pub fn default_kind(mut self, kind: DefaultKind) -> Self {
        self.default_kind = kind;
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a mutually exclusive peer parameter name.
    pub fn xor(mut self, peer: impl Into<String>) -> Self {
        self.xor.push(peer.into());
        self
    }
}

/// A fully-qualified interface identity plus its parameter collections.
///
/// The identity uses the `namespace.path:ClassName` form so the short class
/// name can be recovered without knowing the namespace depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    /// Fully-qualified identity, e.g. `toolkit.registration:Align`.
    pub identity: String,

    /// Base/category name within the source framework, used by include
    /// predicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Documentation string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Declared input parameters, in declaration order.
    #[serde(default)]
    pub inputs: Vec<ParameterSpec>,

    /// Declared output parameters, in declaration order.
    #[serde(default)]
    pub outputs: Vec<ParameterSpec>,
}

impl InterfaceDescriptor {
    /// Creates a descriptor with the given identity and no parameters.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            base: None,
            doc: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Sets the base/category name.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Sets the documentation string.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Adds an input parameter.
    pub fn input(mut self, param: ParameterSpec) -> Self {
        self.inputs.push(param);
        self
    }

    /// Adds an output parameter.
    pub fn output(mut self, param: ParameterSpec) -> Self {
        self.outputs.push(param);
        self
    }

    /// Returns the short class name (the part after `:`), or the whole
    /// identity when it carries no namespace.
    pub fn short_name(&self) -> &str {
        match self.identity.rsplit_once(':') {
            Some((_, name)) => name,
            None => &self.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_serde() {
        let tag = TypeTag::Range {
            base: RangeBase::Int,
            low: Some(1.0),
            high: Some(40.0),
        };
        let json = serde_json::to_string(&tag).unwrap();
        let parsed: TypeTag = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tag);

        let parsed: TypeTag = serde_json::from_str(r#"{"kind": "file"}"#).unwrap();
        assert_eq!(parsed, TypeTag::File);
    }

    #[test]
    fn test_shape_names() {
        assert_eq!(TypeTag::Int.shape_name(), "int");
        assert_eq!(
            TypeTag::MultiPath {
                inner: Box::new(TypeTag::File)
            }
            .shape_name(),
            "multi_path"
        );
        assert!(TypeTag::Directory.is_file_like());
        assert!(!TypeTag::Str.is_file_like());
    }

    #[test]
    fn test_short_name() {
        let desc = InterfaceDescriptor::new("toolkit.registration:Align");
        assert_eq!(desc.short_name(), "Align");

        let desc = InterfaceDescriptor::new("Align");
        assert_eq!(desc.short_name(), "Align");
    }

    #[test]
    fn test_parameter_builder() {
        let param = ParameterSpec::new("dimension", TypeTag::Int)
            .mandatory()
            .default_value(3)
            .description("Image dimension");
        assert!(param.mandatory);
        assert_eq!(param.default, Some(serde_json::json!(3)));
        assert_eq!(param.description.as_deref(), Some("Image dimension"));
    }
}
