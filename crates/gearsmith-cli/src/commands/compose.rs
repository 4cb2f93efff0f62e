//! Compose command implementation
//!
//! Walks a spec tree over a registry and publishes one manifest per
//! materialized interface.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;

use gearsmith_spec::{ComposeOptions, ComposeReport, Composer, DirectorySink, NodeStatus};

use crate::builder::{self, BuildConfig};
use crate::input::{load_registry, load_tree};

/// Run the compose command
///
/// # Arguments
/// * `registry_path` - Path to the interface registry JSON
/// * `tree_path` - Path to the spec tree JSON
/// * `output` - Output root for gear directories (omit for a dry run)
/// * `filter` - Optional regex restricting which node paths materialize
/// * `version` - Version stamped into every manifest
/// * `dummy` - Suffix manifest names/versions with `-dummy`
/// * `no_validate` - Publish manifests without structural validation
/// * `build` - Build a container image per published gear directory
///
/// # Returns
/// Exit code: 0 if no node failed, 1 otherwise
#[allow(clippy::too_many_arguments)]
pub fn run(
    registry_path: &str,
    tree_path: &str,
    output: Option<&str>,
    filter: Option<&str>,
    version: Option<&str>,
    dummy: bool,
    no_validate: bool,
    build: bool,
) -> Result<ExitCode> {
    let registry = load_registry(Path::new(registry_path))?;
    let tree = load_tree(Path::new(tree_path))?;

    let path_filter = filter
        .map(Regex::new)
        .transpose()
        .with_context(|| format!("Invalid --filter pattern: {}", filter.unwrap_or_default()))?;

    let options = ComposeOptions {
        path_filter,
        version: version.map(str::to_string),
        dummy,
        ..Default::default()
    };
    let composer = Composer::new(&registry, options);

    println!("{} {}", "Composing:".cyan().bold(), tree_path);

    let report = match output {
        Some(root) => {
            let mut sink = DirectorySink::new(root);
            if no_validate {
                sink = sink.without_validation();
            }
            composer.compose(&tree, Some(&mut sink))?
        }
        None => {
            println!("{}", "No --output given; dry run only.".dimmed());
            composer.compose(&tree, None)?
        }
    };

    print_report(&report);

    if build {
        if let Some(root) = output {
            build_generated(&report, Path::new(root), version.unwrap_or("latest"))?;
        } else {
            println!("{}", "--build ignored without --output.".yellow());
        }
    }

    if report.failed_count() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &ComposeReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            NodeStatus::Generated => {
                println!("  {} {}", "ok".green(), outcome.path);
            }
            NodeStatus::Skipped { reason } => {
                println!("  {} {} ({})", "--".dimmed(), outcome.path.dimmed(), reason);
            }
            NodeStatus::Failed { error } => {
                println!("  {} {}: {}", "!!".red().bold(), outcome.path, error);
            }
        }
    }
    for warning in &report.warnings {
        println!(
            "  {} {}.{}: {}",
            "!".yellow(),
            warning.path,
            warning.param,
            warning.message
        );
    }
    println!(
        "{} {} generated, {} skipped, {} failed",
        "Summary:".bold(),
        report.generated_count(),
        report.skipped_count(),
        report.failed_count()
    );
}

/// Builds an image for each generated manifest's gear directory.
fn build_generated(report: &ComposeReport, output_root: &Path, version: &str) -> Result<()> {
    let noise: Vec<String> = gearsmith_spec::DEFAULT_NOISE_SEGMENTS
        .iter()
        .map(|s| s.to_string())
        .collect();
    for (path, manifest) in &report.manifests {
        let gear_dir = output_root.join(gearsmith_spec::artifact_dir(path, &noise));
        let config = BuildConfig::new(&manifest.name, manifest.version.as_deref().unwrap_or(version));
        println!("{} {}", "Building:".cyan().bold(), config.tag);
        let outcome = builder::build_gear(&gear_dir, &config)?;
        println!("  {} {}", "ok".green(), outcome.tag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearsmith_spec::{InterfaceDescriptor, Manifest, Namespace, ParameterSpec, Registry, TypeTag};
    use serde_json::json;
    use std::fs;

    fn write_fixtures(dir: &Path) -> (String, String) {
        let align = InterfaceDescriptor::new("toolkit.interfaces.registration:Align")
            .base("CommandInterface")
            .input(ParameterSpec::new("moving_image", TypeTag::File).mandatory())
            .input(ParameterSpec::new("dimension", TypeTag::Int).default_value(json!(3)));
        let registration =
            Namespace::new("toolkit.interfaces.registration").interface("Align", align);
        let interfaces =
            Namespace::new("toolkit.interfaces").namespace("registration", registration);
        let toolkit = Namespace::new("toolkit").namespace("interfaces", interfaces);
        let registry = Registry::new().namespace("toolkit", toolkit);

        let registry_path = dir.join("registry.json");
        fs::write(&registry_path, serde_json::to_string(&registry).unwrap()).unwrap();

        let tree_path = dir.join("tree.json");
        fs::write(
            &tree_path,
            r#"{"toolkit.interfaces.registration.Align": {}}"#,
        )
        .unwrap();

        (
            registry_path.to_str().unwrap().to_string(),
            tree_path.to_str().unwrap().to_string(),
        )
    }

    #[test]
    fn test_compose_writes_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let (registry_path, tree_path) = write_fixtures(dir.path());
        let out = dir.path().join("gears");

        let code = run(
            &registry_path,
            &tree_path,
            Some(out.to_str().unwrap()),
            None,
            Some("0.1.0"),
            false,
            false,
            false,
        )
        .unwrap();
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));

        let text = fs::read_to_string(out.join("toolkit/Align/manifest.json")).unwrap();
        let manifest = Manifest::from_json(&text).unwrap();
        assert_eq!(manifest.name, "Align");
        assert_eq!(manifest.version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_compose_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (registry_path, tree_path) = write_fixtures(dir.path());

        run(
            &registry_path, &tree_path, None, None, None, false, false, false,
        )
        .unwrap();
        assert!(!dir.path().join("gears").exists());
    }

    #[test]
    fn test_compose_rejects_bad_filter() {
        let dir = tempfile::tempdir().unwrap();
        let (registry_path, tree_path) = write_fixtures(dir.path());

        let err = run(
            &registry_path,
            &tree_path,
            None,
            Some("[unclosed"),
            None,
            false,
            false,
            false,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid --filter"));
    }
}
