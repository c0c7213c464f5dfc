//! fpgagz CLI - gzip files on an FPGA over a serial link.
//!
//! ## Features
//!
//! - Compress a file on the device and verify the result before saving it
//! - Interactive serial port selection
//! - Batch check of a directory of `.gz` files
//! - Environment variable and config file support
//! - JSON run reports for scripting

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use env_logger::Env;
use fpgagz::{CheckSummary, RequestHeader, TransferConfig, TransferReport};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod config;
mod serial;

use config::Config;
use serial::{SerialOptions, select_serial_port};

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set while the device transfer runs. Ctrl-C outside a transfer exits
/// right away, since nothing else checks [`INTERRUPTED`].
static TRANSFER_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Exit code for a run stopped by the user.
const EXIT_CANCELLED: i32 = 130;

/// Check if animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Whether Ctrl-C was pressed.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Marks the device transfer as running until dropped.
struct TransferGuard;

impl TransferGuard {
    fn start() -> Self {
        TRANSFER_ACTIVE.store(true, Ordering::SeqCst);
        Self
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        TRANSFER_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Record a Ctrl-C. Returns the exit code to leave with right away, or
/// `None` when the running transfer will stop at the next chunk.
fn on_interrupt() -> Option<i32> {
    INTERRUPTED.store(true, Ordering::SeqCst);
    if TRANSFER_ACTIVE.load(Ordering::SeqCst) {
        None
    } else {
        Some(EXIT_CANCELLED)
    }
}

/// Failures that are about how the tool was invoked rather than what it did.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Bad arguments or settings (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// Some files did not pass a check (exit code 3).
    #[error("{0}")]
    Verification(String),
    /// The user interrupted the run (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

/// fpgagz - offload gzip compression to an FPGA over UART.
///
/// Environment variables:
///   FPGAGZ_PORT              - Default serial port
///   FPGAGZ_BAUD              - Baud rate (default: 115200)
///   FPGAGZ_CHUNK_SIZE        - Payload bytes per write (default: 16384)
///   FPGAGZ_TIMEOUT_MS        - Read timeout in milliseconds (default: 1000)
///   FPGAGZ_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser, Debug)]
#[command(name = "fpgagz")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// File to compress.
    #[arg(required_unless_present = "check_dir", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Serial port to use (prompted for if not specified).
    #[arg(short, long, env = "FPGAGZ_PORT")]
    port: Option<String>,

    /// Baud rate.
    #[arg(short, long, env = "FPGAGZ_BAUD")]
    baud: Option<u32>,

    /// Read timeout in milliseconds; an idle read this long ends a drain.
    #[arg(long, env = "FPGAGZ_TIMEOUT_MS", value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Payload bytes per write.
    #[arg(long, env = "FPGAGZ_CHUNK_SIZE", value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Bytes per read while draining the device.
    #[arg(long, value_name = "BYTES")]
    read_buffer: Option<usize>,

    /// Output file (default: <input name>.gz in the current directory).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Decompress every .gz file in a directory and report totals.
    #[arg(long, value_name = "DIR", conflicts_with_all = ["input", "output"])]
    check_dir: Option<PathBuf>,

    /// Print a JSON report to stdout.
    #[arg(long)]
    json: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, env = "FPGAGZ_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Path to a configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Machine-readable summary of a successful run.
#[derive(Serialize)]
struct RunReport<'a> {
    input: &'a Path,
    output: &'a Path,
    port: &'a str,
    original_size: usize,
    compressed_size: usize,
    ratio: f64,
    verified: bool,
    #[serde(flatten)]
    transfer: &'a TransferReport,
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            exit_code(&err)
        },
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    // Help, version and usage errors print and exit here
    let cli = Cli::try_parse().unwrap_or_else(|e| e.exit());

    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(cli.verbose, cli.quiet);

    debug!(
        "fpgagz v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    // A blocked prompt read is restarted after the signal, so the handler
    // has to end the process itself when no transfer is polling the flag
    if let Err(e) = ctrlc::set_handler(|| {
        if let Some(code) = on_interrupt() {
            eprintln!();
            std::process::exit(code);
        }
    }) {
        debug!("Could not install Ctrl-C handler: {e}");
    }
    fpgagz::set_interrupt_checker(was_interrupted);

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    if let Some(dir) = &cli.check_dir {
        return cmd_check_dir(&cli, dir);
    }

    let input = cli
        .input
        .as_deref()
        .ok_or_else(|| CliError::Usage("no input file given".into()))?;
    cmd_compress(&cli, &config, input)
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(verbose >= 2)
        .format_timestamp(if verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

/// Resolve transfer settings: flag or environment, then config file, then
/// built-in defaults.
fn transfer_config(cli: &Cli, config: &Config) -> TransferConfig {
    let defaults = TransferConfig::default();
    TransferConfig {
        baud_rate: cli
            .baud
            .or(config.port.baud)
            .unwrap_or(defaults.baud_rate),
        read_timeout: cli
            .timeout_ms
            .or(config.transfer.timeout_ms)
            .map_or(defaults.read_timeout, Duration::from_millis),
        chunk_size: cli
            .chunk_size
            .or(config.transfer.chunk_size)
            .unwrap_or(defaults.chunk_size),
        read_buffer_size: cli
            .read_buffer
            .or(config.transfer.read_buffer)
            .unwrap_or(defaults.read_buffer_size),
    }
}

/// Compress one file on the device.
fn cmd_compress(cli: &Cli, config: &Config, input: &Path) -> Result<()> {
    let data = fpgagz::file::read_input(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} original data length = {} bytes",
            style("📦").cyan(),
            data.len()
        );
    }

    // Reject before any port is touched
    RequestHeader::for_payload(data.len())
        .with_context(|| format!("cannot compress {}", input.display()))?;

    let transfer = transfer_config(cli, config);
    transfer
        .validate()
        .map_err(|e| CliError::Usage(e.to_string()))?;

    let output = match &cli.output {
        Some(path) => path.clone(),
        None => fpgagz::file::output_path(input)?,
    };

    let options = SerialOptions {
        port: cli.port.clone(),
        non_interactive: cli.non_interactive,
        quiet: cli.quiet,
    };
    let port = select_serial_port(&options, config)?;

    if !cli.quiet {
        eprintln!(
            "{} Using port {} at {} baud",
            style("🔌").cyan(),
            style(&port).green(),
            transfer.baud_rate
        );
    }

    let fancy = !cli.quiet && use_fancy_output();
    let pb = if fancy {
        let pb = ProgressBar::new(data.len() as u64);
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb
    } else {
        ProgressBar::hidden()
    };

    debug!(
        "At least {:.1}s will be spent waiting for the device to go quiet",
        transfer
            .idle_overhead(data.len())
            .as_secs_f64()
    );

    let guard = TransferGuard::start();
    let report = fpgagz::compress_on_port(&port, &data, &transfer, |progress| {
        if fancy {
            pb.set_position(progress.end as u64);
            pb.set_message(format!("gzip length = {}", progress.compressed_len));
        } else if !cli.quiet {
            eprintln!("  {progress}");
        }
    });
    drop(guard);
    pb.finish_and_clear();

    let report = match report {
        Err(fpgagz::Error::Cancelled) => {
            return Err(CliError::Cancelled("compression cancelled".into()).into());
        },
        other => other.with_context(|| format!("compression on {port} failed"))?,
    };

    fpgagz::verify(&data, &report.compressed)
        .into_result()
        .context("device output failed verification")?;

    fpgagz::file::write_output(&output, &report.compressed)
        .with_context(|| format!("failed to save {}", output.display()))?;

    let ratio = 100.0 * report.compressed.len() as f64 / data.len().max(1) as f64;

    if cli.json {
        let run_report = RunReport {
            input,
            output: &output,
            port: &port,
            original_size: data.len(),
            compressed_size: report.compressed.len(),
            ratio,
            verified: true,
            transfer: &report,
        };
        println!("{}", serde_json::to_string_pretty(&run_report)?);
    }

    if !cli.quiet {
        eprintln!("  original size   = {} bytes", data.len());
        eprintln!(
            "  compressed size = {} bytes ({ratio:.2}%)",
            report.compressed.len()
        );
        eprintln!(
            "{} verification passed, saved {}",
            style("✓").green().bold(),
            style(output.display()).yellow()
        );
    }

    Ok(())
}

/// Check every .gz file in a directory.
fn cmd_check_dir(cli: &Cli, dir: &Path) -> Result<()> {
    let summary = fpgagz::check_directory(dir)
        .with_context(|| format!("failed to check {}", dir.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_check_summary(&summary);
    }

    if summary.is_empty() {
        anyhow::bail!("no .gz file found in {}", dir.display());
    }
    if !summary.all_ok() {
        return Err(CliError::Verification(format!(
            "{} of {} files failed to decompress",
            summary.failed,
            summary.total()
        ))
        .into());
    }
    Ok(())
}

fn print_check_summary(summary: &CheckSummary) {
    for file in &summary.files {
        if let Some(err) = &file.error {
            let name = file
                .path
                .file_name()
                .map_or_else(
                    || file.path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                );
            eprintln!("{} {name} decompress failed : {err}", style("✗").red());
        }
    }

    eprintln!("\n{}", style("Summary :").bold());
    eprintln!("  total {} files", summary.total());
    if summary.all_ok() {
        eprintln!("  no error");
    } else {
        eprintln!("  error {} files !!", summary.failed);
    }
    eprintln!(
        "  total    compressed size = {} bytes",
        summary.compressed_size
    );
    eprintln!(
        "  total de-compressed size = {} bytes",
        summary.decompressed_size
    );
    eprintln!("  compression ratio        = {:.2}%", summary.ratio());
}

/// Print an error and its causes to stderr.
fn report_error(err: &anyhow::Error) {
    eprintln!("{} {err}", style("error:").red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("  {} {cause}", style("caused by:").dim());
    }
}

/// Map an error to the process exit code.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::Usage(_) => 2,
            CliError::Verification(_) => 3,
            CliError::Cancelled(_) => EXIT_CANCELLED,
        };
    }

    for cause in err.chain() {
        if let Some(lib_err) = cause.downcast_ref::<fpgagz::Error>() {
            if matches!(lib_err, fpgagz::Error::Cancelled) {
                return EXIT_CANCELLED;
            }
            if lib_err.is_verification_failure() {
                return 3;
            }
            if lib_err.is_device_failure() {
                return 4;
            }
        }
    }

    1
}
