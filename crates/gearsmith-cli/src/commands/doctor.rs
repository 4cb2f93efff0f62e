//! Doctor command implementation
//!
//! Checks system dependencies and configuration.

use std::process::{Command, ExitCode};

use anyhow::Result;
use colored::Colorize;

/// Run the doctor command
///
/// Checks:
/// - Version information
/// - Docker availability (needed for `compose --build`)
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run() -> Result<ExitCode> {
    println!("{}", "Gearsmith Doctor".cyan().bold());
    println!("{}", "================".cyan());
    println!();

    println!("{}", "Versions:".bold());
    println!(
        "  {} gearsmith-cli v{}",
        "->".green(),
        env!("CARGO_PKG_VERSION")
    );
    match rustc_version() {
        Some(version) => println!("  {} rustc {}", "->".green(), version),
        None => println!("  {} rustc (not found)", "->".yellow()),
    }
    println!();

    let mut all_ok = true;

    println!("{}", "Dependencies:".bold());
    match which::which("docker") {
        Ok(path) => {
            println!("  {} docker ({})", "ok".green(), path.display());
        }
        Err(_) => {
            all_ok = false;
            println!("  {} docker not found in PATH", "!!".yellow());
            println!(
                "     {}",
                "Docker is required for building gear images with --build.".dimmed()
            );
        }
    }

    println!();
    if all_ok {
        println!("{}", "All checks passed.".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", "Some checks failed.".yellow().bold());
        Ok(ExitCode::from(1))
    }
}

fn rustc_version() -> Option<String> {
    let output = Command::new("rustc").arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout);
    version.split_whitespace().nth(1).map(str::to_string)
}
