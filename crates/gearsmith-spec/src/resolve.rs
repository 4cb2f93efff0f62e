//! Runtime argument resolution.
//!
//! Given a manifest, a caller config, and an input directory laid out as
//! `<input_root>/<input_name>/<file>`, produces the concrete argument map
//! for one interface execution. Precedence is fixed: bound input files,
//! then manifest defaults, then caller config overriding both.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::ResolveError;
use crate::manifest::Manifest;
use crate::param::InterfaceDescriptor;
use crate::registry::Registry;

/// A fully resolved, ready-to-run interface call.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    /// Fully-qualified interface identity from the manifest.
    pub identity: String,

    /// The interface being invoked.
    pub descriptor: InterfaceDescriptor,

    /// Keyword arguments: bound input paths, manifest defaults, and caller
    /// config, in that precedence order.
    pub arguments: IndexMap<String, Value>,

    /// Working/output directory for the interface. The resolver only
    /// carries it; creating it belongs to the caller.
    pub output_root: PathBuf,
}

/// Non-fatal finding recorded while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveWarning {
    /// The declared input concerned.
    pub param: String,
    /// What went unexpectedly.
    pub message: String,
}

/// The outcome of a resolve run.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// The resolved call.
    pub invocation: Invocation,

    /// Findings that did not prevent resolution (e.g. an unprovided
    /// mandatory input, left for the interface itself to reject).
    pub warnings: Vec<ResolveWarning>,
}

/// Resolves call arguments for `manifest`.
///
/// Each declared input is bound to the single file under
/// `<input_root>/<name>/`; an empty or absent directory leaves the input
/// unbound (with a warning when the input is mandatory), and more than one
/// file is a hard error with no partial result. Caller `config` entries
/// override bindings and manifest defaults unconditionally. `output_root`
/// is carried into the invocation untouched.
pub fn resolve(
    manifest: &Manifest,
    registry: &Registry,
    input_root: &Path,
    output_root: &Path,
    config: &IndexMap<String, Value>,
) -> Result<Resolution, ResolveError> {
    let identity = manifest.interface_identity().to_string();
    let descriptor = registry
        .find_interface(&identity)
        .cloned()
        .ok_or_else(|| ResolveError::UnknownInterface {
            identity: identity.clone(),
        })?;

    let mut arguments = IndexMap::new();
    let mut warnings = Vec::new();
    for (name, entry) in &manifest.inputs {
        match single_file(&input_root.join(name))? {
            Binding::One(path) => {
                arguments.insert(name.clone(), Value::String(path.display().to_string()));
            }
            Binding::None => {
                if !entry.is_optional() {
                    warnings.push(ResolveWarning {
                        param: name.clone(),
                        message: format!("mandatory input '{}' was not provided", name),
                    });
                }
            }
            Binding::Many(count) => {
                return Err(ResolveError::AmbiguousInput {
                    param: name.clone(),
                    count,
                });
            }
        }
    }

    for (key, entry) in &manifest.config {
        if let Some(default) = &entry.default {
            arguments.insert(key.clone(), default.clone());
        }
    }
    for (key, value) in config {
        arguments.insert(key.clone(), value.clone());
    }

    Ok(Resolution {
        invocation: Invocation {
            identity,
            descriptor,
            arguments,
            output_root: output_root.to_path_buf(),
        },
        warnings,
    })
}

enum Binding {
    None,
    One(PathBuf),
    Many(usize),
}

/// Scans one input directory. Dotfiles are ignored; a missing directory
/// counts as no file.
fn single_file(dir: &Path) -> Result<Binding, ResolveError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Binding::None),
        Err(err) => return Err(err.into()),
    };
    let mut files: Vec<PathBuf> = entries
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'))
        })
        .collect();
    match files.len() {
        0 => Ok(Binding::None),
        1 => Ok(Binding::One(files.remove(0))),
        n => Ok(Binding::Many(n)),
    }
}
