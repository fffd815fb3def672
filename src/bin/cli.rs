use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use triagescope::report::{findings_table, format_analysis, format_changes, format_validation, indicators_table};
use triagescope::{
    IndicatorAnalyzer, Snapshot, SnapshotComparator, SnapshotLoader, SnapshotValidator,
    TriageConfig,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Validate, triage and compare forensic host snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML file with thresholds and allow-lists
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Treat validation warnings as errors
    #[arg(long)]
    warnings_as_errors: bool,

    /// Accept pid 0 in the process list
    #[arg(long)]
    allow_zero_pid: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check snapshot files for structural and semantic problems
    Validate {
        /// Snapshot files to validate
        files: Vec<PathBuf>,

        /// Also validate every *.json file under this directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output format: text, table, json
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Validate a snapshot, then look for security indicators
    Analyze {
        /// Snapshot file
        file: PathBuf,

        /// Output format: text, table, json
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Diff two snapshots of the same host
    Compare {
        /// Earlier snapshot
        baseline: PathBuf,

        /// Later snapshot
        current: PathBuf,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Table,
    Json,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("triagescope=debug,info")
    } else {
        EnvFilter::new("triagescope=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗ Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> CliResult<TriageConfig> {
    let mut config = match &cli.config {
        Some(path) => TriageConfig::load(path)?,
        None => TriageConfig::default(),
    };
    if cli.warnings_as_errors {
        config.validator.warnings_as_errors = true;
    }
    if cli.allow_zero_pid {
        config.validator.allow_zero_pid = true;
    }
    Ok(config)
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    let loader = SnapshotLoader::new();

    match cli.command {
        Commands::Validate { files, dir, output } => cmd_validate(&loader, &config, files, dir, output),
        Commands::Analyze { file, output } => cmd_analyze(&loader, &config, &file, output),
        Commands::Compare { baseline, current, output } => {
            cmd_compare(&loader, &config, &baseline, &current, output)
        }
    }
}

fn cmd_validate(
    loader: &SnapshotLoader,
    config: &TriageConfig,
    mut files: Vec<PathBuf>,
    dir: Option<PathBuf>,
    output: OutputFormat,
) -> CliResult<()> {
    if let Some(dir) = dir {
        info!("Discovering snapshots in {}", dir.display());
        files.extend(loader.discover(&dir)?);
    }
    if files.is_empty() {
        return Err("No snapshot files given. Pass files or --dir.".into());
    }

    let validator = SnapshotValidator::new(config.validator.clone());
    let mut failed = Vec::new();
    let mut json_reports = Vec::new();
    let (mut total_errors, mut total_warnings) = (0, 0);

    for path in &files {
        let bytes = loader.read_bytes(path)?;
        let report = validator.validate_bytes(&bytes);
        total_errors += report.error_count();
        total_warnings += report.warning_count();
        if !report.is_valid() {
            failed.push(path.display().to_string());
        }

        match output {
            OutputFormat::Text => print!("{}", format_validation(&path.display().to_string(), &report)),
            OutputFormat::Table => {
                println!("{}", path.display());
                if !report.findings.is_empty() {
                    println!("{}", findings_table(&report));
                }
            }
            OutputFormat::Json => json_reports.push(serde_json::json!({
                "file": path.display().to_string(),
                "is_valid": report.is_valid(),
                "report": report,
            })),
        }
    }

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    } else {
        println!();
    }

    if !failed.is_empty() {
        if output != OutputFormat::Json {
            println!(
                "{} Validation failed: {} errors, {} warnings in {} files",
                "✗".red(),
                total_errors,
                total_warnings,
                files.len()
            );
            println!("  Failed: {}", failed.join(", "));
        }
        return Err("Validation failed".into());
    }

    if output != OutputFormat::Json {
        if total_warnings > 0 {
            println!(
                "{} {} files validated with {} warnings",
                "⚠".yellow(),
                files.len(),
                total_warnings
            );
        } else {
            println!("{} {} files validated successfully", "✓".green(), files.len());
        }
    }
    Ok(())
}

/// Validate first so the typed decode never sees a document with known problems.
fn load_validated(
    loader: &SnapshotLoader,
    validator: &SnapshotValidator,
    path: &Path,
) -> CliResult<Snapshot> {
    let text = loader.read_text(path)?;
    let report = validator.validate_str(&text);

    if !report.is_valid() {
        eprint!("{}", format_validation(&path.display().to_string(), &report));
        return Err(format!("{} failed validation", path.display()).into());
    }
    if report.has_warnings() {
        warn!("{}: {} validation warnings", path.display(), report.warning_count());
    }

    Ok(Snapshot::from_json(&text)?)
}

fn cmd_analyze(
    loader: &SnapshotLoader,
    config: &TriageConfig,
    path: &Path,
    output: OutputFormat,
) -> CliResult<()> {
    let validator = SnapshotValidator::new(config.validator.clone());
    let snapshot = load_validated(loader, &validator, path)?;

    info!("Analyzing {}", snapshot.hostname());
    let report = IndicatorAnalyzer::new(config.analyzer.clone()).analyze(&snapshot);

    match output {
        OutputFormat::Text => print!("{}", format_analysis(&report)),
        OutputFormat::Table => {
            if report.is_clean() {
                println!("{} No indicators found", "✓".green());
            } else {
                println!("{}", indicators_table(&report));
            }
            println!("\nRisk Level: {} ({} indicators)", report.risk_level, report.total());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_compare(
    loader: &SnapshotLoader,
    config: &TriageConfig,
    baseline: &Path,
    current: &Path,
    output: OutputFormat,
) -> CliResult<()> {
    let validator = SnapshotValidator::new(config.validator.clone());
    let before = load_validated(loader, &validator, baseline)?;
    let after = load_validated(loader, &validator, current)?;

    if before.hostname() != after.hostname() {
        warn!(
            "Comparing snapshots from different hosts: {} vs {}",
            before.hostname(),
            after.hostname()
        );
    }

    let changes = SnapshotComparator::new(config.compare.clone()).compare(&before, &after);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Text | OutputFormat::Table => print!("{}", format_changes(&changes)),
    }
    Ok(())
}
