//! sshdrop - push a file to a remote host over plain shell commands.
//!
//! The file is base64-encoded locally, appended to a remote scratch file in
//! fixed-size chunks (one ssh session per chunk), then decoded in place.

#![forbid(unsafe_code)]

mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sshdrop_common::config::load::TRACKED_KEYS;
use sshdrop_common::{
    ConfigSource, ConfigWarning, DropError, LoadedConfig, LocalShell, LogConfig, RemoteShell,
    SshShell, UploadOptions, UploadReport, Uploader, format_bytes, init_logging, load_config,
    plan_upload, probe, validate_config,
};
use tracing::{debug, info, warn};

use crate::progress::Progress;

#[derive(Parser)]
#[command(name = "sshdrop")]
#[command(author, version, about = "Upload a file over SSH in base64 chunks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/sshdrop/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload SOURCE to DEST on the remote host
    Push {
        /// Local file to upload
        source: PathBuf,

        /// Destination path on the remote host
        dest: String,

        #[command(flatten)]
        remote: RemoteArgs,

        #[command(flatten)]
        transfer: TransferArgs,

        /// Run the commands with the local shell instead of ssh
        #[arg(long)]
        local: bool,
    },

    /// Show the chunk schedule and commands without contacting the remote
    Plan {
        /// Local file to inspect
        source: PathBuf,

        /// Destination path used in the command preview
        #[arg(default_value = "<dest>")]
        dest: String,

        /// Encoded characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Check that the remote host accepts commands
    Check {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration and where each value came from
    Show,
}

#[derive(Args, Debug, Default)]
struct RemoteArgs {
    /// Remote host name or address
    #[arg(long)]
    host: Option<String>,

    /// Remote user
    #[arg(short, long)]
    user: Option<String>,

    /// SSH port
    #[arg(short, long)]
    port: Option<u16>,

    /// SSH private key
    #[arg(short, long, value_name = "PATH")]
    identity: Option<String>,

    /// Name of the environment variable holding the SSH password
    #[arg(long, value_name = "VAR")]
    password_env: Option<String>,
}

impl RemoteArgs {
    fn apply(self, loaded: &mut LoadedConfig) {
        let remote = &mut loaded.config.remote;
        let mut touched = Vec::new();
        if let Some(host) = self.host {
            remote.host = host;
            touched.push("remote.host");
        }
        if let Some(user) = self.user {
            remote.user = Some(user);
            touched.push("remote.user");
        }
        if let Some(port) = self.port {
            remote.port = port;
            touched.push("remote.port");
        }
        if let Some(identity) = self.identity {
            remote.identity_file = Some(identity);
            touched.push("remote.identity_file");
        }
        if let Some(var) = self.password_env {
            remote.password_env = Some(var);
            touched.push("remote.password_env");
        }
        for key in touched {
            loaded.mark(key, ConfigSource::CommandLine);
        }
    }
}

#[derive(Args, Debug, Default)]
struct TransferArgs {
    /// Encoded characters per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Remote scratch file for the encoded text
    #[arg(long, value_name = "PATH")]
    temp_path: Option<String>,

    /// Create the destination directory if missing
    #[arg(long)]
    create_dirs: bool,

    /// Compare SHA-256 of the uploaded file with the source
    #[arg(long)]
    verify: bool,

    /// Remove the scratch file after a successful upload
    #[arg(long)]
    cleanup: bool,

    /// Record failed steps and keep going instead of aborting
    #[arg(long)]
    continue_on_error: bool,
}

impl TransferArgs {
    fn apply(self, loaded: &mut LoadedConfig) {
        let transfer = &mut loaded.config.transfer;
        let mut touched = Vec::new();
        if let Some(size) = self.chunk_size {
            transfer.chunk_size = size;
            touched.push("transfer.chunk_size");
        }
        if let Some(path) = self.temp_path {
            transfer.temp_path = path;
            touched.push("transfer.temp_path");
        }
        if self.create_dirs {
            transfer.create_dirs = true;
        }
        if self.verify {
            transfer.verify_checksum = true;
            touched.push("transfer.verify_checksum");
        }
        if self.cleanup {
            transfer.cleanup = true;
            touched.push("transfer.cleanup");
        }
        if self.continue_on_error {
            transfer.continue_on_error = true;
        }
        for key in touched {
            loaded.mark(key, ConfigSource::CommandLine);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The config file may set the log level, so read it before logging starts.
    let loaded = load_config(cli.config.as_deref());
    let default_level = loaded
        .as_ref()
        .map(|l| l.config.general.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    let mut log_config = LogConfig::from_env(&default_level).with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = match init_logging(&log_config) {
        Ok(guards) => Some(guards),
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    };

    let result = match loaded {
        Ok(loaded) => run(cli, loaded).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, mut loaded: LoadedConfig) -> Result<ExitCode> {
    let json = cli.json;
    match cli.command {
        Commands::Push {
            source,
            dest,
            remote,
            transfer,
            local,
        } => {
            remote.apply(&mut loaded);
            transfer.apply(&mut loaded);
            check_findings(&validate_config(&loaded.config, Some(&dest)), local)?;

            let options = UploadOptions::from_config(&loaded.config, dest);
            let report = if local {
                let timeout = command_timeout(&loaded);
                let mut shell = LocalShell::new();
                if let Some(limit) = timeout {
                    shell = shell.with_timeout(limit);
                }
                push(shell, options, &source, json).await?
            } else {
                let shell = SshShell::from_config(&loaded.config.remote)?;
                push(shell, options, &source, json).await?
            };

            print_report(&report, json)?;
            Ok(exit_code_for(&report))
        }
        Commands::Plan {
            source,
            dest,
            chunk_size,
        } => {
            let transfer = TransferArgs {
                chunk_size,
                ..TransferArgs::default()
            };
            transfer.apply(&mut loaded);
            let options = UploadOptions::from_config(&loaded.config, dest);
            let plan = plan_upload(&source, &options)
                .await
                .with_context(|| format!("failed to plan upload of {}", source.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(ExitCode::SUCCESS);
            }
            println!("Source:      {}", plan.source.display());
            println!(
                "Size:        {} ({} bytes)",
                format_bytes(plan.source_bytes),
                plan.source_bytes
            );
            println!("SHA-256:     {}", plan.sha256);
            println!("Encoded:     {} characters", plan.encoded_len);
            println!(
                "Chunks:      {} x {} (last {})",
                plan.chunk_count, plan.chunk_size, plan.last_chunk_len
            );
            println!("Scratch:     {}", plan.temp_path);
            println!("\nCommands:");
            for cmd in &plan.commands {
                if cmd.repeat > 1 {
                    println!("  [{}] {}  (x{})", cmd.step, cmd.command, cmd.repeat);
                } else {
                    println!("  [{}] {}", cmd.step, cmd.command);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { remote } => {
            remote.apply(&mut loaded);
            check_findings(&validate_config(&loaded.config, None), false)?;
            let shell = SshShell::from_config(&loaded.config.remote)?;
            let target = shell.describe();
            let elapsed = probe(&shell).await?;

            if json {
                #[derive(Serialize)]
                struct CheckOutput {
                    target: String,
                    ok: bool,
                    latency_ms: u64,
                }
                let output = CheckOutput {
                    target,
                    ok: true,
                    latency_ms: elapsed.as_millis() as u64,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}: ok ({} ms)", target, elapsed.as_millis());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => show_config(&loaded, json).map(|()| ExitCode::SUCCESS),
    }
}

async fn push<S: RemoteShell>(
    shell: S,
    options: UploadOptions,
    source: &Path,
    json: bool,
) -> Result<UploadReport> {
    debug!(transport = %shell.describe(), chunk_size = options.chunk_size, "Preparing upload");
    let uploader = Uploader::new(shell, options);
    let progress = Progress::for_stderr(json);
    let report = uploader.upload(source, &progress).await;
    if report.is_err()
        && let Progress::Bar(ref bar) = progress
    {
        bar.abandon();
    }
    Ok(report?)
}

/// A report with failed steps exits 1 even though every step ran.
fn exit_code_for(report: &UploadReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn command_timeout(loaded: &LoadedConfig) -> Option<Duration> {
    match loaded.config.remote.command_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

/// Log warnings and fail on errors. `local` skips checks that only concern ssh.
fn check_findings(findings: &[ConfigWarning], local: bool) -> Result<(), DropError> {
    let mut errors = Vec::new();
    for finding in findings {
        if local && finding.field.starts_with("remote.") {
            continue;
        }
        if finding.is_error() {
            errors.push(format!("{}: {}", finding.field, finding.message));
        } else {
            warn!(field = finding.field, "{}", finding.message);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DropError::Config(errors.join("; ")))
    }
}

fn print_report(report: &UploadReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if let Some(listing) = &report.listing {
        println!("{}", listing);
    }
    match report.remote_bytes {
        Some(bytes) => println!(
            "{}: {} ({} bytes) in {} chunks, {} ms",
            report.dest_path,
            format_bytes(bytes),
            bytes,
            report.chunk_count,
            report.elapsed_ms
        ),
        None => println!("{}: size unknown", report.dest_path),
    }
    match report.checksum_verified {
        Some(true) => println!("checksum: ok"),
        Some(false) => println!("checksum: MISMATCH"),
        None => {}
    }
    if !report.failed_steps.is_empty() {
        println!("{} step(s) failed:", report.failed_steps.len());
        for failure in &report.failed_steps {
            match failure.chunk {
                Some(chunk) => println!(
                    "  {} chunk {}: [{}] {}",
                    failure.step, chunk, failure.code, failure.message
                ),
                None => println!("  {}: [{}] {}", failure.step, failure.code, failure.message),
            }
        }
    }
    info!(dest = %report.dest_path, complete = report.is_complete(), "Done");
    Ok(())
}

#[derive(Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: serde_json::Value,
    source: ConfigSource,
}

fn config_entries(loaded: &LoadedConfig) -> Result<Vec<ConfigEntry>> {
    let tree = serde_json::to_value(&loaded.config)?;
    Ok(TRACKED_KEYS
        .iter()
        .map(|&key| {
            let value = key
                .split_once('.')
                .and_then(|(section, field)| tree.get(section)?.get(field).cloned())
                .unwrap_or(serde_json::Value::Null);
            ConfigEntry {
                key,
                value,
                source: loaded.source_of(key),
            }
        })
        .collect())
}

fn show_config(loaded: &LoadedConfig, json: bool) -> Result<()> {
    let entries = config_entries(loaded)?;
    let findings = validate_config(&loaded.config, None);

    if json {
        #[derive(Serialize)]
        struct ConfigOutput<'a> {
            path: Option<&'a Path>,
            values: Vec<ConfigEntry>,
            findings: Vec<ConfigWarning>,
        }
        let output = ConfigOutput {
            path: loaded.path.as_deref(),
            values: entries,
            findings,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &loaded.path {
        Some(path) => println!("# config file: {}", path.display()),
        None => println!("# no config file, using defaults"),
    }
    let width = TRACKED_KEYS.iter().map(|k| k.len()).max().unwrap_or(0);
    for entry in &entries {
        let value = match &entry.value {
            serde_json::Value::Null => "(unset)".to_string(),
            serde_json::Value::String(s) if s.is_empty() => "(empty)".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!(
            "{:width$} = {:<24} [{}]",
            entry.key,
            value,
            entry.source,
            width = width
        );
    }
    for finding in &findings {
        println!("{}", finding);
    }
    Ok(())
}

fn print_error(err: &anyhow::Error) {
    match err.downcast_ref::<DropError>() {
        Some(drop_err) => {
            eprintln!("error: {:#}\n", err);
            eprint!("{}", drop_err.code().entry().format_full());
        }
        None => eprintln!("error: {:#}", err),
    }
}
