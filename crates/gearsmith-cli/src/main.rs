//! Gearsmith CLI - Command-line interface for manifest composition
//!
//! This binary provides commands for composing packaging manifests from a
//! spec tree, resolving runtime call arguments, and validating manifests.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

// Use modules from the library crate
use gearsmith_cli::commands;

/// Gearsmith - Interface Manifest Composition System
#[derive(Parser)]
#[command(name = "gearsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose manifests from a spec tree over an interface registry
    #[command(disable_version_flag = true)]
    Compose {
        /// Path to the interface registry JSON
        #[arg(short, long)]
        registry: String,

        /// Path to the spec tree JSON
        #[arg(short, long)]
        spec: String,

        /// Output root for gear directories (omit for a dry run)
        #[arg(short, long)]
        output: Option<String>,

        /// Only process node paths matching this regex
        #[arg(long)]
        filter: Option<String>,

        /// Version stamped into every manifest
        #[arg(long)]
        version: Option<String>,

        /// Suffix manifest names and versions with -dummy (UI smoke artifacts)
        #[arg(long)]
        dummy: bool,

        /// Publish manifests without structural validation
        #[arg(long)]
        no_validate: bool,

        /// Build a container image per published gear directory
        #[arg(long)]
        build: bool,
    },

    /// Resolve runtime call arguments for a manifest
    Resolve {
        /// Path to the manifest JSON
        #[arg(short, long)]
        manifest: String,

        /// Path to the interface registry JSON
        #[arg(short, long)]
        registry: String,

        /// Input root laid out as <input_root>/<input_name>/<file>
        #[arg(short, long, default_value = "input")]
        inputs: String,

        /// Working/output directory handed to the interface (not created)
        #[arg(short, long, default_value = "output")]
        output: String,

        /// Path to a caller config JSON
        #[arg(short, long)]
        config: Option<String>,

        /// Print the full invocation instead of the argument map alone
        #[arg(long)]
        describe: bool,
    },

    /// Validate a manifest file without composing or resolving
    Validate {
        /// Path to the manifest JSON
        #[arg(short, long)]
        manifest: String,
    },

    /// Check system dependencies and configuration
    Doctor,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compose {
            registry,
            spec,
            output,
            filter,
            version,
            dummy,
            no_validate,
            build,
        } => commands::compose::run(
            &registry,
            &spec,
            output.as_deref(),
            filter.as_deref(),
            version.as_deref(),
            dummy,
            no_validate,
            build,
        ),
        Commands::Resolve {
            manifest,
            registry,
            inputs,
            output,
            config,
            describe,
        } => commands::resolve::run(
            &manifest,
            &registry,
            &inputs,
            &output,
            config.as_deref(),
            describe,
        ),
        Commands::Validate { manifest } => commands::validate::run(&manifest),
        Commands::Doctor => commands::doctor::run(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
