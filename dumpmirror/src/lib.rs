//! Library module for dumpmirror
//!
//! Argument parsing, connection source selection and exit code mapping live
//! here so they can be tested; `main.rs` only wires them together.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, Parser};
use dumpmirror_core::{
    BackupOptions, ConnectionProfile, DumpMirrorError, DumpToolConfig, MongodumpExecutor,
    Orchestrator, Result, RunReport, load_credential_file, resolve_targets,
};
use tracing::info;

/// Exit code for configuration, selection and credential file errors.
pub const EXIT_CONFIGURATION: u8 = 2;
/// Exit code when a run root cannot be created.
pub const EXIT_DIRECTORY: u8 = 3;
/// Exit code when the dump utility fails or cannot be started.
pub const EXIT_DUMP: u8 = 4;
/// Exit code for I/O failures while reading the dump tree or writing the report.
pub const EXIT_IO: u8 = 5;
/// Exit code for a completed run whose schema mirror is incomplete.
pub const EXIT_DEGRADED: u8 = 6;

const OUTPUT_DIR_PROMPT: &str = "Enter the output directory: ";

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "dumpmirror")]
#[command(about = "MongoDB backup with schema-only mirror")]
#[command(version)]
#[command(long_about = "
dumpmirror - MongoDB backup with schema-only mirror

Runs mongodump for every database or collection listed in the selection
file, into <output-dir>/dump_<timestamp>. Afterwards it writes
<output-dir>/dump_<timestamp>_mirror: the same tree with every
.metadata.json copied and every .bson replaced by an empty document.

SELECTION FILE:
  One 'database<TAB>collection' pair per line. An empty collection
  ('inventory<TAB>') selects the whole database.

CREDENTIAL FILE:
  { \"mongo_host\": \"...\", \"mongo_user\": \"...\",
    \"mongo_password\": \"...\", \"output_dir\": \"...\" }

EXAMPLES:
  dumpmirror --config creds.json --dbs databases.txt
  dumpmirror --uri mongodb://backup:pw@db1:27017 --output-dir /backups --dbs databases.txt
")]
#[command(group(ArgGroup::new("connection").required(true).args(["config", "uri"])))]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// JSON credential file
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON file with mongo_host, mongo_user, mongo_password and output_dir"
    )]
    pub config: Option<PathBuf>,

    /// Connection string
    #[arg(
        long,
        value_name = "URI",
        help = "MongoDB connection string with user and password (redacted in logs)"
    )]
    pub uri: Option<String>,

    /// Output base directory
    #[arg(
        short,
        long,
        value_name = "DIR",
        help = "Base directory for run roots (overrides output_dir from --config)"
    )]
    pub output_dir: Option<PathBuf>,

    /// Selection file
    #[arg(
        long,
        value_name = "FILE",
        help = "Tab-separated database/collection selection file"
    )]
    pub dbs: PathBuf,

    /// Dump utility
    #[arg(
        long,
        env = "MONGODUMP_PATH",
        value_name = "PATH",
        help = "mongodump executable (default: bundled mongo_tools/bin/mongodump, else PATH)"
    )]
    pub mongodump: Option<PathBuf>,

    /// In-tool schema-only mode
    #[arg(long, help = "Ask mongodump itself to skip documents (collection targets only)")]
    pub schema_only: bool,

    /// Skip the mirror
    #[arg(long, help = "Do not synthesize the schema-only mirror")]
    pub no_mirror: bool,

    /// JSON run report
    #[arg(long, value_name = "FILE", help = "Write a JSON run report to this file")]
    pub report: Option<PathBuf>,
}

/// Flags shared by every invocation.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Where to connect and where to write.
#[derive(Debug)]
pub struct ConnectionSettings {
    /// Connection for the dump utility
    pub profile: ConnectionProfile,
    /// Base directory for the run roots
    pub output_dir: PathBuf,
}

/// Resolves the connection profile and output base directory.
///
/// With `--config` both come from the credential file, though `--output-dir`
/// wins when given. With `--uri` the output directory comes from
/// `--output-dir` or is read from `input` after writing a prompt to `prompt`.
///
/// # Errors
/// Returns a configuration error for missing or invalid settings.
pub fn resolve_connection<R: BufRead, W: Write>(
    cli: &Cli,
    input: &mut R,
    prompt: &mut W,
) -> Result<ConnectionSettings> {
    match (&cli.config, &cli.uri) {
        (Some(path), None) => {
            let file = load_credential_file(path)?;
            Ok(ConnectionSettings {
                profile: file.profile,
                output_dir: cli.output_dir.clone().unwrap_or(file.output_dir),
            })
        }
        (None, Some(uri)) => {
            let profile = ConnectionProfile::from_uri(uri)?;
            let output_dir = match &cli.output_dir {
                Some(dir) => dir.clone(),
                None => prompt_output_dir(input, prompt)?,
            };
            Ok(ConnectionSettings {
                profile,
                output_dir,
            })
        }
        _ => Err(DumpMirrorError::configuration(
            "exactly one of --config or --uri is required",
        )),
    }
}

/// Asks for the output base directory on `prompt` and reads one line from `input`.
///
/// # Errors
/// Returns a configuration error when the terminal cannot be used or the
/// answer is empty.
pub fn prompt_output_dir<R: BufRead, W: Write>(input: &mut R, prompt: &mut W) -> Result<PathBuf> {
    write!(prompt, "{OUTPUT_DIR_PROMPT}")
        .and_then(|()| prompt.flush())
        .map_err(|e| {
            DumpMirrorError::configuration(format!(
                "Failed to write output directory prompt: {e}"
            ))
        })?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(|e| {
        DumpMirrorError::configuration(format!("Failed to read output directory: {e}"))
    })?;

    let answer = answer.trim();
    if answer.is_empty() {
        return Err(DumpMirrorError::configuration(
            "Output directory cannot be empty",
        ));
    }
    Ok(PathBuf::from(answer))
}

/// Reads the selection file.
///
/// # Errors
/// Returns a configuration error if the file cannot be read as UTF-8.
pub fn read_selection(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        DumpMirrorError::configuration(format!(
            "Failed to read database list '{}': {e}",
            path.display()
        ))
    })
}

/// Dump utility configuration from `--mongodump`/`MONGODUMP_PATH` or the
/// default lookup.
pub fn dump_tool(cli: &Cli) -> DumpToolConfig {
    cli.mongodump
        .clone()
        .map_or_else(DumpToolConfig::locate, DumpToolConfig::new)
}

/// Runs a complete backup for the parsed arguments.
///
/// The selection is parsed before any prompt or directory is touched.
///
/// # Errors
/// Propagates every error of the run; see [`exit_code_for`] for how they
/// map to exit codes.
pub async fn execute(cli: &Cli) -> Result<RunReport> {
    let targets = resolve_targets(&read_selection(&cli.dbs)?)?;

    let settings =
        resolve_connection(cli, &mut std::io::stdin().lock(), &mut std::io::stdout())?;
    info!("Target: {}", settings.profile.redacted());

    let executor = MongodumpExecutor::new(dump_tool(cli), &settings.profile)?;
    info!("Dump utility: {}", executor.tool().program_name());

    let options = BackupOptions::new(settings.output_dir)
        .with_mirror(!cli.no_mirror)
        .with_schema_only(cli.schema_only);
    let report = Orchestrator::new(executor, options)
        .run_targets(&targets)
        .await?;

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        info!("Run report written to {}", path.display());
    }

    Ok(report)
}

/// Writes `report` as pretty JSON.
///
/// # Errors
/// Returns `Io` on failure; the dump itself has already finished by then.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(report_encoding_error)?;
    std::fs::write(path, json).map_err(|e| {
        DumpMirrorError::io(format!("Failed to write run report to {}", path.display()), e)
    })
}

fn report_encoding_error(source: serde_json::Error) -> DumpMirrorError {
    DumpMirrorError::io("Failed to encode run report", std::io::Error::from(source))
}

/// Exit code for a failed run.
pub const fn exit_code_for(error: &DumpMirrorError) -> u8 {
    match error {
        DumpMirrorError::Configuration { .. }
        | DumpMirrorError::MalformedSelection { .. }
        | DumpMirrorError::Serialization { .. } => EXIT_CONFIGURATION,
        DumpMirrorError::DirectoryCreation { .. } => EXIT_DIRECTORY,
        DumpMirrorError::ProcessLaunch { .. } | DumpMirrorError::DumpUtility { .. } => EXIT_DUMP,
        DumpMirrorError::Io { .. } => EXIT_IO,
    }
}

/// Exit code for a finished run: 0, or [`EXIT_DEGRADED`] when the mirror is
/// incomplete.
pub fn exit_code_for_report(report: &RunReport) -> u8 {
    if report.is_degraded() {
        EXIT_DEGRADED
    } else {
        0
    }
}

/// Human-readable run summary for stdout.
pub fn summary(report: &RunReport) -> String {
    let mut text = format!(
        "Dumped {} unit(s) from {} database(s) into {}",
        report.unit_count(),
        report.targets.len(),
        report.output_root.display()
    );

    if let (Some(mirror_root), Some(mirror)) = (&report.mirror_root, &report.mirror) {
        let _ = write!(
            text,
            "\nSchema mirror: {} collection(s) in {}",
            mirror.pairs.len(),
            mirror_root.display()
        );
        if !mirror.is_complete() {
            let _ = write!(
                text,
                "\nSchema mirror incomplete: {} failure(s)",
                mirror.failures.len()
            );
            for failure in &mirror.failures {
                let _ = write!(text, "\n  {}: {}", failure.path.display(), failure.reason);
            }
        }
    }

    text
}

/// Formats an error with its chain of sources.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}
