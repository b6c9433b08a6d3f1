//! Protocol Compatibility CLI
//!
//! Checks a new schema version against an old one, or against a directory of
//! stored versions, and fails CI when the change breaks compatibility.
//!
//! Usage:
//!   protocompat check --old v1.json --new v2.json --mode FULL
//!   protocompat history --dir schemas/history --new current.json
//!   protocompat modes
//!
//! Exit codes: 0 compatible, 1 error, 2 gate failed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use familiar_protocompat::compatibility::{check_history, load_history};
use familiar_protocompat::report::{render, render_history};
use familiar_protocompat::{
    build, compare, Bump, CompatConfig, CompatibilityMode, FailOn, FileAst, ReportFormat,
    SchemaGraph,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "protocompat")]
#[command(about = "Detect breaking changes between protocol schema versions")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schema versions
    Check {
        /// Previous version (parser AST as JSON)
        #[arg(short, long)]
        old: PathBuf,
        /// Candidate version (parser AST as JSON)
        #[arg(short, long)]
        new: PathBuf,
        /// Compatibility mode (overrides config)
        #[arg(short, long)]
        mode: Option<String>,
        /// Output format: text or json
        #[arg(short, long)]
        format: Option<ReportFormat>,
        /// Also list informational findings
        #[arg(short, long)]
        verbose: bool,
        /// Lowest severity that fails the check: error or warning
        #[arg(long)]
        fail_on: Option<FailOn>,
    },

    /// Check a candidate against a directory of stored versions
    History {
        /// Directory of v<semver>.json snapshots
        #[arg(short, long)]
        dir: PathBuf,
        /// Candidate version (parser AST as JSON)
        #[arg(short, long)]
        new: PathBuf,
        /// Compatibility mode (overrides config)
        #[arg(short, long)]
        mode: Option<String>,
        /// Output format: text or json
        #[arg(short, long)]
        format: Option<ReportFormat>,
        #[arg(short, long)]
        verbose: bool,
        /// Lowest severity that fails the check: error or warning
        #[arg(long)]
        fail_on: Option<FailOn>,
    },

    /// List compatibility modes
    Modes,

    /// Write a default config file
    InitConfig {
        #[arg(short, long, default_value = "protocompat.toml")]
        output: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the gate passed
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = CompatConfig::load_from(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Check {
            old,
            new,
            mode,
            format,
            verbose,
            fail_on,
        } => {
            let mode = resolve_mode(mode.as_deref(), &config)?;
            let format = format.unwrap_or(config.output.format);
            let verbose = verbose || config.output.verbose;
            let fail_on = fail_on.unwrap_or(config.check.fail_on);

            let old_graph = load_graph(&old)?;
            let new_graph = load_graph(&new)?;
            info!(mode = %mode, old = %old.display(), new = %new.display(), "running check");

            let result = compare(mode, &old_graph, &new_graph);
            print!("{}", render(&result, format, verbose)?);
            if verbose {
                println!("📦 Suggested version bump: {}", Bump::required_for(&result));
            }

            Ok(!fail_on.should_fail(&result))
        }

        Commands::History {
            dir,
            new,
            mode,
            format,
            verbose,
            fail_on,
        } => {
            let mode = resolve_mode(mode.as_deref(), &config)?;
            let format = format.unwrap_or(config.output.format);
            let verbose = verbose || config.output.verbose;
            let fail_on = fail_on.unwrap_or(config.check.fail_on);

            let history = load_history(&dir)
                .with_context(|| format!("failed to load history from {}", dir.display()))?;
            println!("📂 Loaded {} stored versions from {:?}\n", history.len(), dir);

            let candidate = load_graph(&new)?;
            let report = check_history(mode, &history, &candidate);
            print!("{}", render_history(&report, format, verbose)?);

            if let (Some(latest), Some(check)) = (history.last(), report.checks.last()) {
                let next = latest.version.bumped(Bump::required_for(&check.result));
                println!("📦 Suggested next version: {}", next);
            }

            Ok(report
                .checks
                .iter()
                .all(|c| !fail_on.should_fail(&c.result)))
        }

        Commands::Modes => {
            for mode in CompatibilityMode::ALL {
                println!("{:<20} {}", mode.as_str(), describe(mode));
            }
            Ok(true)
        }

        Commands::InitConfig { output, force } => {
            if Path::new(&output).exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output);
            }
            CompatConfig::default()
                .save(&output)
                .with_context(|| format!("failed to write {}", output))?;
            println!("✅ Wrote default config to {}", output);
            Ok(true)
        }
    }
}

/// Mode errors surface before any file is read
fn resolve_mode(arg: Option<&str>, config: &CompatConfig) -> anyhow::Result<CompatibilityMode> {
    match arg {
        Some(s) => Ok(s.parse()?),
        None => Ok(config.check.mode),
    }
}

fn load_graph(path: &Path) -> anyhow::Result<SchemaGraph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let ast = FileAst::from_json(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let graph = build(&ast).with_context(|| format!("invalid schema in {}", path.display()))?;
    Ok(graph)
}

fn describe(mode: CompatibilityMode) -> &'static str {
    match mode {
        CompatibilityMode::None => "no checking",
        CompatibilityMode::Backward => "new readers accept data from old writers",
        CompatibilityMode::Forward => "old readers accept data from new writers",
        CompatibilityMode::Full => "both backward and forward",
        CompatibilityMode::BackwardTransitive => "backward against every stored version",
        CompatibilityMode::ForwardTransitive => "forward against every stored version",
        CompatibilityMode::FullTransitive => "full against every stored version",
    }
}
