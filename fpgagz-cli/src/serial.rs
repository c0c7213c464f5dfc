//! Interactive serial port selection.
//!
//! Resolution order: explicit `--port`/`FPGAGZ_PORT`, then the config file,
//! then discovery. Discovered ports go through [`fpgagz::select_port`] with
//! a choice source that fits the terminal:
//! - a dialoguer menu when stdin and stderr are terminals
//! - a plain numbered prompt on stdin otherwise
//! - none at all in non-interactive mode

use {
    crate::{CliError, config::Config},
    anyhow::{Context, Result},
    console::style,
    dialoguer::{Error as DialoguerError, Select, theme::ColorfulTheme},
    fpgagz::{
        ChoiceSource, LineChoices, NativePortEnumerator, PortDescriptor, PortEnumerator,
        select::format_port_line, select_port,
    },
    log::debug,
    std::io::{self, BufRead, IsTerminal, Write},
};

/// Options for serial port selection.
#[derive(Debug, Clone, Default)]
pub struct SerialOptions {
    /// Explicit port specified via CLI or environment.
    pub port: Option<String>,
    /// Non-interactive mode (fail if multiple ports).
    pub non_interactive: bool,
    /// Suppress the port listing.
    pub quiet: bool,
}

fn usage_err(message: &str) -> anyhow::Error {
    // Exit code 2, so scripts can tell setup problems from device failures
    CliError::Usage(message.to_string()).into()
}

/// Pick the port to talk to.
pub fn select_serial_port(options: &SerialOptions, config: &Config) -> Result<String> {
    if let Some(port_name) = &options.port {
        return Ok(port_name.clone());
    }

    if let Some(port_name) = &config.port.serial {
        debug!("Using port from config: {port_name}");
        return Ok(port_name.clone());
    }

    let ports = NativePortEnumerator::list_ports().context("failed to list serial ports")?;

    if options.non_interactive {
        if !options.quiet {
            list_ports(&mut io::stderr(), &ports)?;
        }
        return select_non_interactive_port(&ports);
    }

    let result = if ports.len() > 1 && is_interactive_terminal() {
        select_port(&ports, &mut MenuChoices)
    } else {
        let stdin = io::stdin();
        prompt_on_lines(&ports, stdin.lock(), io::stderr(), options.quiet)
    };

    result.map_err(map_selection_error)
}

/// Numbered port listing, one line per port.
fn list_ports<W: Write>(out: &mut W, ports: &[PortDescriptor]) -> io::Result<()> {
    for (i, port) in ports.iter().enumerate() {
        writeln!(out, "{}", format_port_line(i, port))?;
    }
    Ok(())
}

/// Plain numbered prompt. The listing is written here once, and not at all
/// in quiet mode.
fn prompt_on_lines<R: BufRead, W: Write>(
    ports: &[PortDescriptor],
    input: R,
    mut output: W,
    quiet: bool,
) -> fpgagz::Result<String> {
    if !quiet {
        list_ports(&mut output, ports)?;
    }
    select_port(ports, &mut LineChoices::listed(input, output))
}

fn select_non_interactive_port(ports: &[PortDescriptor]) -> Result<String> {
    match ports {
        [] => Err(fpgagz::Error::NoPortsFound.into()),
        [only] => Ok(only.name.clone()),
        _ => Err(usage_err(
            "multiple serial ports found; pass --port in non-interactive mode",
        )),
    }
}

fn map_selection_error(err: fpgagz::Error) -> anyhow::Error {
    match err {
        fpgagz::Error::Cancelled => {
            CliError::Cancelled("port selection cancelled".to_string()).into()
        },
        other => other.into(),
    }
}

fn is_interactive_terminal() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

/// Arrow-key menu on the terminal.
struct MenuChoices;

impl ChoiceSource for MenuChoices {
    fn next_choice(&mut self, ports: &[PortDescriptor]) -> fpgagz::Result<String> {
        eprintln!(
            "{} {} serial ports detected",
            style("ℹ").blue(),
            ports.len()
        );

        let term_width = console::Term::stderr()
            .size()
            .1 as usize;
        let labels: Vec<String> = ports
            .iter()
            .map(|port| port_label(port, term_width.saturating_sub(4)))
            .collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a serial port")
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(map_prompt_error)?;

        selection
            .map(|index| index.to_string())
            .ok_or(fpgagz::Error::Cancelled)
    }
}

fn map_prompt_error(err: DialoguerError) -> fpgagz::Error {
    match err {
        DialoguerError::IO(io_err) => {
            if io_err.kind() == io::ErrorKind::Interrupted {
                fpgagz::Error::Cancelled
            } else {
                fpgagz::Error::Io(io_err)
            }
        },
    }
}

/// Menu label, truncated so narrow terminals don't wrap.
fn port_label(port: &PortDescriptor, max_width: usize) -> String {
    let name = style(&port.name)
        .bold()
        .to_string();
    let detail = if port.description == port.name {
        String::new()
    } else {
        format!(" - {}", style(&port.description).dim())
    };
    let hwid = format!(" [{}]", style(&port.hardware_id).yellow());

    console::truncate_str(&format!("{name}{detail}{hwid}"), max_width, "\u{2026}").into_owned()
}
