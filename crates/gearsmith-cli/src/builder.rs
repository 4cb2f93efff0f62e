//! Container image builds for composed gear directories.
//!
//! Each published gear directory can be handed to `docker build`; stdout
//! and stderr are captured into `<gear_dir>/logs/` so build failures stay
//! inspectable after the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

/// Configuration for one image build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// The build executable, `docker` unless overridden.
    pub program: String,
    /// Tag applied to the built image.
    pub tag: String,
}

impl BuildConfig {
    /// Creates a config tagging the image `name:version`.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            program: "docker".to_string(),
            tag: format!("{}:{}", name, version),
        }
    }
}

/// Outcome of one build, with the captured log locations.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The image tag that was built.
    pub tag: String,
    /// Captured stdout.
    pub stdout_log: PathBuf,
    /// Captured stderr.
    pub stderr_log: PathBuf,
}

/// Returns an error when the build program is not on PATH.
pub fn check_build_program(program: &str) -> Result<PathBuf> {
    which::which(program)
        .with_context(|| format!("'{}' not found in PATH; install it or skip --build", program))
}

/// Builds the image for one gear directory, writing logs under
/// `<gear_dir>/logs/`.
pub fn build_gear(gear_dir: &Path, config: &BuildConfig) -> Result<BuildOutcome> {
    check_build_program(&config.program)?;

    let logs_dir = gear_dir.join("logs");
    fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create logs dir: {}", logs_dir.display()))?;

    let output = Command::new(&config.program)
        .arg("build")
        .arg("-t")
        .arg(&config.tag)
        .arg(gear_dir)
        .output()
        .with_context(|| format!("Failed to run '{} build'", config.program))?;

    let stdout_log = logs_dir.join("build.out");
    let stderr_log = logs_dir.join("build.err");
    fs::write(&stdout_log, &output.stdout)
        .with_context(|| format!("Failed to write {}", stdout_log.display()))?;
    fs::write(&stderr_log, &output.stderr)
        .with_context(|| format!("Failed to write {}", stderr_log.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "build of '{}' failed with {} (logs in {})",
            config.tag,
            output.status,
            logs_dir.display()
        );
    }

    Ok(BuildOutcome {
        tag: config.tag.clone(),
        stdout_log,
        stderr_log,
    })
}
