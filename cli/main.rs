use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use secureshred::config::Config;
use secureshred::pattern::PassScheme;
use secureshred::report::{ExitStatus, FinalState, ShredOutcome, ShredReport};
use secureshred::walker::TreeWalker;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// SecureShred - Overwrite files with multiple patterns, then delete them
#[derive(Parser, Debug)]
#[command(name = "secureshred")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Warning: This operation is irreversible. Use with caution.")]
struct Cli {
    /// Files or directories to shred
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Number of overwrite passes [default: 3]
    #[arg(short, long)]
    passes: Option<usize>,

    /// Recursively shred directories
    #[arg(short, long)]
    recursive: bool,

    /// Show detailed progress
    #[arg(short, long)]
    verbose: bool,

    /// Delete under the original name instead of renaming first
    #[arg(long)]
    no_rename: bool,

    /// Read back deterministic passes and compare
    #[arg(long)]
    verify: bool,

    /// Pass pattern scheme
    #[arg(long, value_enum)]
    scheme: Option<PassScheme>,

    /// Path to configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose turns on debug output for this crate
    let default_filter = if cli.verbose { "secureshred=debug" } else { "warn" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .init();

    debug!(?cli, "SecureShred starting");

    match cmd_shred(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

/// Merge file/env config with command-line flags
fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load_with_env(cli.config.as_deref())?;

    if let Some(passes) = cli.passes {
        cfg.passes = passes;
    }
    if let Some(scheme) = cli.scheme {
        cfg.scheme = scheme;
    }
    cfg.recursive |= cli.recursive;
    cfg.verify |= cli.verify;
    if cli.no_rename {
        cfg.rename_before_delete = false;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Ask before destroying anything
fn confirm(paths: &[PathBuf]) -> Result<bool> {
    eprintln!("The following will be irreversibly destroyed:");
    for p in paths {
        eprintln!("  {}", p.display());
    }
    eprint!("Continue? [y/N]: ");
    io::stderr().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

/// Create a spinner for the run; the number of files is not known up front
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} file(s) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn describe(outcome: &ShredOutcome) -> String {
    let state = match &outcome.final_state {
        FinalState::Deleted if outcome.rename_skipped => "deleted (rename skipped)".to_string(),
        FinalState::Deleted => "deleted".to_string(),
        FinalState::RenamedButNotDeleted => match &outcome.residual_path {
            Some(p) => format!("overwritten, entry remains at {}", p.display()),
            None => "overwritten, entry remains".to_string(),
        },
        FinalState::Failed(reason) => format!("FAILED: {}", reason),
    };
    format!(
        "{}: {} pass(es), {} bytes, {}",
        outcome.path.display(),
        outcome.passes_completed,
        outcome.bytes_processed,
        state
    )
}

async fn cmd_shred(cli: Cli) -> Result<ExitCode> {
    let cfg = build_config(&cli)?;

    if !cli.yes && !confirm(&cli.paths)? {
        eprintln!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut walker = TreeWalker::new(&cfg)?;
    info!(passes = walker.plan().len(), recursive = cfg.recursive, "starting shred run");

    let cancel = walker.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current pass");
            cancel.cancel();
        }
    });

    let show_progress = !cli.json && !cli.verbose;
    let spinner = show_progress.then(|| create_spinner("Shredding"));

    let report = walker
        .run_with(&cli.paths, |outcome| {
            if let Some(pb) = &spinner {
                pb.inc(1);
                pb.set_message(outcome.path.display().to_string());
            }
            if cli.verbose && !cli.json {
                eprintln!("{}", describe(outcome));
            }
        })
        .await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, cli.verbose);
    }

    Ok(match report.exit_status() {
        ExitStatus::Success => ExitCode::SUCCESS,
        ExitStatus::PartialFailure => ExitCode::from(1),
        ExitStatus::TotalFailure => ExitCode::from(2),
    })
}

fn print_summary(report: &ShredReport, verbose: bool) {
    // Failures are always listed, successes only when verbose (already printed)
    if !verbose {
        for outcome in report.outcomes().iter().filter(|o| !o.is_deleted()) {
            eprintln!("{}", describe(outcome));
        }
    }

    if verbose {
        for dir in report.directories().iter().filter(|d| !d.removed) {
            eprintln!(
                "{}: directory left in place ({})",
                dir.path.display(),
                dir.error.as_deref().unwrap_or("unknown reason")
            );
        }
    }

    let s = report.summarize();
    println!(
        "Shredded {}/{} file(s), {} bytes overwritten ({} failed, {} left on disk)",
        s.deleted,
        s.total,
        report.total_bytes(),
        s.failed,
        s.renamed_not_deleted
    );

    match report.exit_status() {
        ExitStatus::Success => println!("File shredding completed successfully."),
        _ => println!("File shredding completed with some errors."),
    }
}
