//! # fpgagz
//!
//! A library for offloading gzip compression to an FPGA over a serial link.
//!
//! The device takes a length-prefixed request, compresses the payload as it
//! streams in and sends back a standard gzip stream. This crate provides:
//!
//! - the request header codec
//! - a chunked transfer engine with timeout-based response draining
//! - round-trip verification by decompressing the device output
//! - serial port discovery and selection
//! - a batch checker for directories of `.gz` files
//!
//! ## Supported Platforms
//!
//! - **Native** (default): Linux, macOS, Windows via the `serialport` crate
//!
//! ## Features
//!
//! - `native` (default): Native serial port support
//! - `serde`: Serialization support for reports and port descriptors
//!
//! ## Example
//!
//! ```rust,no_run
//! use fpgagz::{TransferConfig, verify};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = fpgagz::file::read_input("firmware.bin")?;
//!
//!     #[cfg(feature = "native")]
//!     {
//!         use fpgagz::{NativePortEnumerator, PortEnumerator, ScriptedChoices, select_port};
//!
//!         let ports = NativePortEnumerator::list_ports()?;
//!         let port = select_port(&ports, &mut ScriptedChoices::new(["0"]))?;
//!
//!         let report =
//!             fpgagz::compress_on_port(&port, &data, &TransferConfig::default(), |p| {
//!                 println!("  {p}");
//!             })?;
//!
//!         verify(&data, &report.compressed).into_result()?;
//!         fpgagz::file::write_output("firmware.bin.gz", &report.compressed)?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod check;
pub mod error;
pub mod file;
pub mod port;
pub mod protocol;
pub mod select;
pub mod transfer;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker consulted between transfer chunks.
///
/// The checker should return `true` when the current transfer should stop
/// (for example after receiving Ctrl-C in CLI applications). Only the first
/// registration takes effect.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator};
#[cfg(feature = "native")]
pub use transfer::compress_on_port;
pub use {
    check::{CheckSummary, FileCheck, check_directory},
    error::{Error, Result},
    port::{Port, PortDescriptor, PortEnumerator, SerialConfig},
    protocol::{HEADER_LEN, HEADER_MAGIC, MAX_PAYLOAD_LEN, RequestHeader},
    select::{ChoiceSource, LineChoices, ScriptedChoices, parse_choice, select_port},
    transfer::{ChunkProgress, GzipOffload, TransferConfig, TransferReport, compress_with},
    verify::{VerificationResult, VerifyError, verify},
};
