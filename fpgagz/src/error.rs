//! Error types for fpgagz.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for fpgagz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fpgagz operations.
///
/// None of these are retried automatically. A failed transfer leaves the
/// device in an unknown state, so the only recovery is a new request.
#[derive(Debug, Error)]
pub enum Error {
    /// Payload does not fit in the 3-byte length field of the request header.
    #[error("payload of {len} bytes is too large (must be smaller than {max} bytes)")]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
        /// Exclusive upper bound on the payload length.
        max: usize,
    },

    /// The serial port could not be opened.
    #[error("unable to open port {port}")]
    PortOpen {
        /// Port name/path.
        port: String,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// Writing the header or a chunk to the port failed.
    #[error("port write error")]
    TransportWrite(#[source] io::Error),

    /// Reading the device response failed.
    #[error("port read error")]
    TransportRead(#[source] io::Error),

    /// The device produced no output for the whole transfer.
    #[error("no data received from the device")]
    EmptyResponse,

    /// No serial ports are available.
    #[error("no serial ports detected")]
    NoPortsFound,

    /// The accumulated response is not a valid gzip stream.
    #[error("decompression failed")]
    DecompressionFailed(#[source] io::Error),

    /// The decompressed response differs from the original input.
    #[error(
        "decompressed data does not match the original \
         ({actual_len} bytes decompressed, {expected_len} bytes expected)"
    )]
    ContentMismatch {
        /// Length of the original input.
        expected_len: usize,
        /// Length of the decompressed response.
        actual_len: usize,
    },

    /// Reading or writing a local file failed.
    #[error("file I/O error on {}", path.display())]
    FileIo {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The operation was interrupted by the embedding application.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid transfer settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed protocol data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Other I/O error (port enumeration, buffer management).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the error indicates that the round trip produced wrong data,
    /// as opposed to a transport or setup failure.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::DecompressionFailed(_) | Self::ContentMismatch { .. }
        )
    }

    /// Whether the error concerns the device or its port.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Self::NoPortsFound | Self::PortOpen { .. } | Self::EmptyResponse
        )
    }
}

#[cfg(feature = "native")]
impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Self::Io(err.into())
    }
}
