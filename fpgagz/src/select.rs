//! Serial port selection policy.
//!
//! - no ports: [`Error::NoPortsFound`]
//! - one port: picked without asking
//! - several: ask a [`ChoiceSource`] for an index until a valid one arrives
//!
//! The source decides how choices are obtained (terminal prompt, plain line
//! reader, scripted list). Running out of input is [`Error::Cancelled`];
//! there is no other way out of the loop besides a valid index.

use {
    crate::{
        error::{Error, Result},
        port::PortDescriptor,
    },
    log::{debug, info},
    std::{
        collections::VecDeque,
        io::{BufRead, Write},
    },
};

/// Prompt text shown when a choice is needed.
pub const SELECT_PROMPT: &str = "Please select a port (enter a number): ";

/// Supplier of port choices.
pub trait ChoiceSource {
    /// Produce the next raw choice for `ports`.
    ///
    /// Returns [`Error::Cancelled`] when no more input can be produced.
    fn next_choice(&mut self, ports: &[PortDescriptor]) -> Result<String>;
}

/// Parse a choice as a base-10 index below `count`.
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&index| index < count)
}

/// Pick one port out of `ports`.
pub fn select_port(ports: &[PortDescriptor], source: &mut dyn ChoiceSource) -> Result<String> {
    match ports {
        [] => Err(Error::NoPortsFound),
        [only] => {
            info!("Auto-selected port: {}", only.name);
            Ok(only.name.clone())
        },
        _ => loop {
            let raw = source.next_choice(ports)?;
            match parse_choice(&raw, ports.len()) {
                Some(index) => return Ok(ports[index].name.clone()),
                None => debug!("Ignoring invalid port choice {:?}", raw.trim()),
            }
        },
    }
}

/// Port listing line, `  0.  description  hwid=...`.
pub fn format_port_line(index: usize, port: &PortDescriptor) -> String {
    format!(
        "  {index}.  {}  hwid={}",
        port.description, port.hardware_id
    )
}

/// Line-oriented choice source: lists the ports once, then prompts and reads
/// one line per choice.
pub struct LineChoices<R, W> {
    input: R,
    output: W,
    listed: bool,
}

impl<R: BufRead, W: Write> LineChoices<R, W> {
    /// Read choices from `input`, writing the listing and prompts to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            listed: false,
        }
    }

    /// Like [`LineChoices::new`], for callers that already showed the ports
    /// (or chose not to). Only the prompt is written.
    pub fn listed(input: R, output: W) -> Self {
        Self {
            input,
            output,
            listed: true,
        }
    }
}

impl<R: BufRead, W: Write> ChoiceSource for LineChoices<R, W> {
    fn next_choice(&mut self, ports: &[PortDescriptor]) -> Result<String> {
        if !self.listed {
            for (i, port) in ports.iter().enumerate() {
                writeln!(self.output, "{}", format_port_line(i, port))?;
            }
            self.listed = true;
        }

        write!(self.output, "{SELECT_PROMPT}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::Cancelled);
        }
        Ok(line)
    }
}

/// Fixed sequence of choices, for automation and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChoices {
    choices: VecDeque<String>,
    asked: usize,
}

impl ScriptedChoices {
    /// Create a source that replays `choices` in order.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }

    /// How many times a choice was requested.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl ChoiceSource for ScriptedChoices {
    fn next_choice(&mut self, _ports: &[PortDescriptor]) -> Result<String> {
        self.asked += 1;
        self.choices
            .pop_front()
            .ok_or(Error::Cancelled)
    }
}
