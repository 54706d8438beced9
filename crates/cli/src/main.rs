// FieldTally CLI - config-driven harvest verification runs

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use fieldtally_engine::orchestrate::{run_estates, CancelFlag, EstateUnit};
use fieldtally_engine::{CachedDirectory, EngineError, RunResult};

use fieldtally_cli::config::CliConfig;
use fieldtally_cli::data::{CsvDirectory, CsvGateway};
use fieldtally_cli::exit_codes::{
    EXIT_CONFIG, EXIT_PARTIAL, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "ftally")]
#[command(about = "Harvest-scan verification: reconcile creator and verifier records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress stderr logging and summary
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation over a date range from a TOML run config
    #[command(after_help = "\
Examples:
  ftally run harvest.toml --from 2025-05-01 --to 2025-05-31
  ftally run harvest.toml --from 2025-05-01 --to 2025-06-30 --json
  ftally run harvest.toml --from 2025-05-01 --to 2025-05-31 --output result.json")]
    Run {
        /// Path to the run config file
        config: PathBuf,

        /// Range start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Range end date (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Print the result JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the result JSON to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse and validate a run config without touching any data
    #[command(after_help = "\
Examples:
  ftally validate harvest.toml")]
    Validate {
        /// Path to the run config file
        config: PathBuf,
    },
}

struct CliError {
    code: u8,
    message: String,
}

fn cli_err(code: u8, message: impl Into<String>) -> CliError {
    CliError { code, message: message.into() }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.quiet {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Run { config, from, to, json, output } => {
            cmd_run(config, &from, &to, json, output, cli.quiet)
        }
        Commands::Validate { config } => cmd_validate(config, cli.quiet),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}

fn load_config(path: &PathBuf) -> Result<CliConfig, CliError> {
    let input = std::fs::read_to_string(path)
        .map_err(|e| cli_err(EXIT_USAGE, format!("cannot read {}: {e}", path.display())))?;
    let mut config = CliConfig::from_toml(&input).map_err(|e| cli_err(EXIT_CONFIG, e.to_string()))?;
    config.resolve_paths(path);
    Ok(config)
}

fn parse_date(value: &str, flag: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| cli_err(EXIT_USAGE, format!("{flag}: expected YYYY-MM-DD, got '{value}'")))
}

fn cmd_run(
    config_path: PathBuf,
    from: &str,
    to: &str,
    json_output: bool,
    output_file: Option<PathBuf>,
    quiet: bool,
) -> Result<u8, CliError> {
    let config = load_config(&config_path)?;
    let start = parse_date(from, "--from")?;
    let end = parse_date(to, "--to")?;

    let directory = match config.data.employees {
        Some(ref path) => match CsvDirectory::load(path) {
            Ok(directory) => directory,
            Err(e) => {
                // Names degrade to EMP-{id}; the run itself can proceed.
                tracing::warn!("employee directory unavailable ({e}), using fallback names");
                CsvDirectory::empty()
            }
        },
        None => CsvDirectory::empty(),
    };
    let directory = CachedDirectory::new(directory, 4096, Duration::from_secs(900));

    let gateways: Vec<CsvGateway> = config
        .engine
        .estates
        .iter()
        .map(|estate| CsvGateway::new(&config.data, &estate.id))
        .collect();
    let units: Vec<EstateUnit<'_>> = config
        .engine
        .estates
        .iter()
        .zip(gateways.iter())
        .map(|(estate, gateway)| EstateUnit { estate, gateway })
        .collect();

    let result = run_estates(&units, &config.engine, &directory, start, end, &CancelFlag::new())
        .map_err(|e| match e {
            EngineError::InvalidRange { .. } => cli_err(EXIT_USAGE, e.to_string()),
            EngineError::ConfigParse(_) | EngineError::ConfigValidation(_) => {
                cli_err(EXIT_CONFIG, e.to_string())
            }
            EngineError::Connection(_) => cli_err(EXIT_RUNTIME, e.to_string()),
        })?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        println!("{json_str}");
    }

    if !quiet {
        print_summary(&result);
    }

    if result.skipped.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PARTIAL)
    }
}

/// Human summary to stderr; stdout stays clean for JSON.
fn print_summary(result: &RunResult) {
    for estate in &result.estates {
        let t = &estate.totals;
        eprintln!(
            "{}: {} divisions — {} created, {} verified ({:.1}%), {} with differences ({:.1}%), {} orphan verifier rows [{} ms]",
            estate.estate_name,
            estate.divisions.len(),
            t.created_total,
            t.verified_total,
            t.verification_rate,
            t.difference_total,
            t.difference_rate,
            t.orphan_verifiers,
            estate.duration_ms,
        );
    }
    for unit in &result.skipped {
        match &unit.division_id {
            Some(division) => eprintln!("skipped {}/{}: {}", unit.estate_id, division, unit.reason),
            None => eprintln!("skipped {}: {}", unit.estate_id, unit.reason),
        }
    }
}

fn cmd_validate(config_path: PathBuf, quiet: bool) -> Result<u8, CliError> {
    let config = load_config(&config_path)?;
    if !quiet {
        eprintln!(
            "ok: '{}' — {} estates, {} comparison fields, status filter {}",
            config.engine.name,
            config.engine.estates.len(),
            config.engine.comparison.fields.len(),
            if config.engine.status_filter.is_some() { "configured" } else { "absent" },
        );
    }
    Ok(EXIT_SUCCESS)
}
