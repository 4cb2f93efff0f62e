//! Resolve command implementation
//!
//! Binds a manifest, a caller config, and an input directory into one
//! concrete invocation.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use indexmap::IndexMap;

use gearsmith_spec::resolve;

use crate::input::{load_config, load_manifest, load_registry};

/// Run the resolve command
///
/// # Arguments
/// * `manifest_path` - Path to the manifest JSON
/// * `registry_path` - Path to the interface registry JSON
/// * `input_root` - Directory laid out as `<input_root>/<input_name>/<file>`
/// * `output_root` - Working/output directory handed to the interface
/// * `config_path` - Optional caller config JSON
/// * `describe` - Print the full invocation (identity, descriptor, arguments)
///   instead of the argument map alone
///
/// # Returns
/// Exit code: 0 on success, 1 when resolution fails
pub fn run(
    manifest_path: &str,
    registry_path: &str,
    input_root: &str,
    output_root: &str,
    config_path: Option<&str>,
    describe: bool,
) -> Result<ExitCode> {
    let manifest = load_manifest(Path::new(manifest_path))?;
    let registry = load_registry(Path::new(registry_path))?;
    let config = match config_path {
        Some(path) => load_config(Path::new(path))?,
        None => IndexMap::new(),
    };

    println!(
        "{} {} ({})",
        "Resolving:".cyan().bold(),
        manifest.name,
        manifest.interface_identity()
    );

    let resolution = resolve(
        &manifest,
        &registry,
        Path::new(input_root),
        Path::new(output_root),
        &config,
    )?;

    for warning in &resolution.warnings {
        println!("  {} {}", "!".yellow(), warning.message);
    }

    if describe {
        describe_manifest(&manifest);
        println!("{}", serde_json::to_string_pretty(&resolution.invocation)?);
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&resolution.invocation.arguments)?
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Human listing of what the manifest declares, ahead of the raw
/// invocation dump.
fn describe_manifest(manifest: &gearsmith_spec::Manifest) {
    if let Some(description) = &manifest.description {
        println!("{}", description);
    }
    println!("{}", "Inputs:".bold());
    for (name, entry) in &manifest.inputs {
        println!("  {} {}", name.green(), render_description(entry));
    }
    println!("{}", "Config:".bold());
    for (name, entry) in &manifest.config {
        println!("  {} {}", name.green(), render_description(entry));
    }
    let outputs = &manifest.custom.gearsmith.outputs;
    if !outputs.is_empty() {
        println!("{}", "Possible outputs:".bold());
        for output in outputs {
            println!("  {}", output.name.green());
        }
    }
}

fn render_description(entry: &gearsmith_spec::CanonicalSchemaEntry) -> String {
    let mut text = entry.description.clone().unwrap_or_default();
    if entry.is_optional() {
        text.push_str(" (optional)");
    }
    text
}
