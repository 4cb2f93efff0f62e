//! The introspection boundary: a registry of namespaces and interfaces.
//!
//! The composer addresses interfaces by dotted paths into a namespace
//! tree. The registry is the read-only, already-introspected form of that
//! tree; callers populate it (typically from a JSON fixture produced by
//! the source framework's own reflection) and the composer only looks
//! things up.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::param::InterfaceDescriptor;

/// One entry of a namespace: either a nested namespace or an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEntry {
    /// A nested namespace.
    Namespace(Namespace),
    /// A leaf interface.
    Interface(InterfaceDescriptor),
}

impl RegistryEntry {
    /// Returns the namespace, if this entry is one.
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            RegistryEntry::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Returns the interface descriptor, if this entry is one.
    pub fn as_interface(&self) -> Option<&InterfaceDescriptor> {
        match self {
            RegistryEntry::Interface(desc) => Some(desc),
            _ => None,
        }
    }
}

/// A namespace: a fully-qualified name plus named entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Fully-qualified dotted name, e.g. `toolkit.registration`.
    pub name: String,

    /// Named entries, in introspection order.
    #[serde(default)]
    pub entries: IndexMap<String, RegistryEntry>,
}

impl Namespace {
    /// Creates an empty namespace with the given fully-qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Adds a nested namespace entry.
    pub fn namespace(mut self, key: impl Into<String>, ns: Namespace) -> Self {
        self.entries.insert(key.into(), RegistryEntry::Namespace(ns));
        self
    }

    /// Adds an interface entry.
    pub fn interface(mut self, key: impl Into<String>, desc: InterfaceDescriptor) -> Self {
        self.entries
            .insert(key.into(), RegistryEntry::Interface(desc));
        self
    }

    /// Resolves a dotted path relative to this namespace.
    pub fn resolve(&self, path: &str) -> Option<&RegistryEntry> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_namespace()?.entries.get(segment)?;
        }
        Some(current)
    }

    /// Iterates non-private attribute names (names not starting with `_`).
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|key| !key.starts_with('_'))
    }

    /// Returns true if `other` is nested under this namespace by name.
    ///
    /// Used to keep auto-recursion from wandering into unrelated
    /// namespaces that are merely reachable by reference.
    pub fn contains_by_name(&self, other: &Namespace) -> bool {
        other.name.starts_with(&format!("{}.", self.name))
    }
}

/// The full registry: the root set of namespaces and interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Top-level entries, addressed by their single-segment names.
    #[serde(default)]
    pub entries: IndexMap<String, RegistryEntry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level namespace.
    pub fn namespace(mut self, key: impl Into<String>, ns: Namespace) -> Self {
        self.entries.insert(key.into(), RegistryEntry::Namespace(ns));
        self
    }

    /// Adds a top-level interface.
    pub fn interface(mut self, key: impl Into<String>, desc: InterfaceDescriptor) -> Self {
        self.entries
            .insert(key.into(), RegistryEntry::Interface(desc));
        self
    }

    /// Resolves a dotted path from the registry root.
    pub fn resolve(&self, path: &str) -> Option<&RegistryEntry> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_namespace()?.entries.get(segment)?;
        }
        Some(current)
    }

    /// Looks up an interface by its fully-qualified identity
    /// (`namespace.path:ClassName` form).
    pub fn find_interface(&self, identity: &str) -> Option<&InterfaceDescriptor> {
        let (ns_path, name) = identity.rsplit_once(':')?;
        let entry = if ns_path.is_empty() {
            self.entries.get(name)?
        } else {
            self.resolve(ns_path)?
                .as_namespace()?
                .entries
                .get(name)?
        };
        entry.as_interface()
    }

    /// Parses a registry from a JSON fixture.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
