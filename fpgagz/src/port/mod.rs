//! Port abstraction for the serial link to the compressor.
//!
//! The transfer engine only needs blocking writes and reads bounded by a
//! timeout, so it is written against the `Port` trait rather than a concrete
//! serial port. This keeps the protocol I/O-agnostic and lets tests drive it
//! with a simulated device.
//!
//! ```text
//! +----------------------+
//! |   Transfer engine    |
//! +----------+-----------+
//!            |
//!            v
//! +----------+-----------+
//! |      Port trait      |
//! +----------+-----------+
//!            |
//!            v
//! +----------+-----------+
//! |  NativePort          |
//! |  (serialport crate)  |
//! +----------------------+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use fpgagz::port::Port;
//!
//! fn example<P: Port>(port: &mut P) -> std::io::Result<()> {
//!     port.write_all(b"Hello")?;
//!
//!     let mut buf = [0u8; 32];
//!     let n = port.read(&mut buf)?;
//!     println!("Received: {:?}", &buf[..n]);
//!
//!     Ok(())
//! }
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Baud rate the compressor's UART runs at.
pub const DEFAULT_BAUD: u32 = 115200;

/// Default read timeout. An empty read after this long ends a drain phase.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Serial port configuration.
///
/// The link is always 8N1 without flow control; pacing is left to the
/// application-level drain timeout.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB1", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A serial port as seen during port selection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PortDescriptor {
    /// Port name/path used to open the port.
    pub name: String,
    /// Human-readable description (USB product string, or the name).
    pub description: String,
    /// Hardware identifier, e.g. `USB VID:PID=0403:6010 SER=210319B0`.
    pub hardware_id: String,
}

impl PortDescriptor {
    /// Create a descriptor for a port with no extra hardware information.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            hardware_id: "n/a".to_string(),
        }
    }
}

/// Unified port trait for serial communication.
///
/// Reads must honour the configured timeout: when nothing arrives in time
/// they return `Ok(0)` or an error of kind `TimedOut`, never block forever.
pub trait Port: Read + Write + Send {
    /// Set the read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Get the current timeout.
    fn timeout(&self) -> Duration;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Close the port and release resources.
    ///
    /// After calling this method, the port cannot be used for further I/O.
    fn close(&mut self) -> Result<()>;

    /// Write all bytes, blocking until complete.
    fn write_all_bytes(&mut self, buf: &[u8]) -> std::io::Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)
    }
}

/// Trait for listing available serial ports.
///
/// This is separated from `Port` because it's a static operation that
/// doesn't require an open port instance.
pub trait PortEnumerator {
    /// List all available serial ports.
    fn list_ports() -> Result<Vec<PortDescriptor>>;
}

#[cfg(feature = "native")]
pub use native::{NativePort, NativePortEnumerator};
