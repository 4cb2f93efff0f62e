//! Validate command implementation
//!
//! Validates a manifest file without composing or resolving anything.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use gearsmith_spec::validate_manifest;

use crate::input::load_manifest;

/// Run the validate command
///
/// # Arguments
/// * `manifest_path` - Path to the manifest JSON
///
/// # Returns
/// Exit code: 0 if valid, 1 if invalid
pub fn run(manifest_path: &str) -> Result<ExitCode> {
    println!("{} {}", "Validating:".cyan().bold(), manifest_path);

    let manifest = load_manifest(Path::new(manifest_path))?;
    let result = validate_manifest(&manifest);

    for error in &result.errors {
        println!("  {} {}", "!!".red().bold(), error);
    }
    for warning in &result.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }

    if result.is_ok() {
        println!(
            "{} {} ({} warning(s))",
            "Valid:".green().bold(),
            manifest.name,
            result.warnings.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} {} error(s), {} warning(s)",
            "Invalid:".red().bold(),
            result.errors.len(),
            result.warnings.len()
        );
        Ok(ExitCode::from(1))
    }
}
