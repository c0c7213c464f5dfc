//! Chunked transfer engine.
//!
//! Sends one compression request to the device and collects its gzip
//! output:
//!
//! 1. write the 12-byte [`RequestHeader`](crate::protocol::RequestHeader)
//! 2. for each chunk: write it, then [`drain`] the port until it goes quiet
//! 3. close the port and check that something came back
//!
//! There is no resend mechanism. The device is a streaming pipeline that
//! cannot be asked to repeat itself, so any failure aborts the request and a
//! retry has to start over with a new header.
//!
//! Total latency is at least one read timeout per chunk, since every drain
//! ends with a read that times out. Small chunks keep the device buffers
//! shallow but pay that tax more often; size `chunk_size` and the timeout
//! together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fpgagz::{TransferConfig, verify};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = std::fs::read("input.bin")?;
//!     let config = TransferConfig::default();
//!
//!     #[cfg(feature = "native")]
//!     {
//!         let report = fpgagz::compress_on_port("/dev/ttyUSB1", &data, &config, |p| {
//!             println!("{p}");
//!         })?;
//!         let check = verify(&data, &report.compressed);
//!         assert!(check.matched);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod drain;

pub use chunk::{Chunk, Chunks, DEFAULT_CHUNK_SIZE, chunk_count};
pub use drain::{DEFAULT_READ_BUFFER_SIZE, DrainState, DrainSummary, drain};

use {
    crate::{
        error::{Error, Result},
        port::{DEFAULT_BAUD, DEFAULT_TIMEOUT, Port, SerialConfig},
        protocol::RequestHeader,
    },
    log::{debug, info, trace, warn},
    std::{
        fmt,
        time::{Duration, Instant},
    },
};

/// Settings for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Read timeout; an empty read after this long ends a drain phase.
    pub read_timeout: Duration,
    /// Maximum payload bytes per write.
    pub chunk_size: usize,
    /// Maximum bytes per read during a drain.
    pub read_buffer_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD,
            read_timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl TransferConfig {
    /// Check that the settings can drive a transfer.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than 0".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read buffer size must be greater than 0".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Config("read timeout must be greater than 0".into()));
        }
        if self.baud_rate == 0 {
            return Err(Error::Config("baud rate must be greater than 0".into()));
        }
        Ok(())
    }

    /// Serial settings for opening `port_name` with this configuration.
    pub fn serial_config(&self, port_name: &str) -> SerialConfig {
        SerialConfig::new(port_name, self.baud_rate).with_timeout(self.read_timeout)
    }

    /// Time spent waiting on the final empty read of every drain.
    pub fn idle_overhead(&self, payload_len: usize) -> Duration {
        let drains = chunk_count(payload_len, self.chunk_size.max(1)).max(1);
        self.read_timeout
            .saturating_mul(u32::try_from(drains).unwrap_or(u32::MAX))
    }
}

/// Progress observation emitted after each chunk's drain.
///
/// Purely informational; it has no protocol meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Index of the chunk just sent.
    pub index: usize,
    /// Total number of chunks in the transfer.
    pub chunk_count: usize,
    /// Offset of the chunk's first byte.
    pub start: usize,
    /// Offset one past the chunk's last byte.
    pub end: usize,
    /// Payload length.
    pub total: usize,
    /// Compressed bytes received so far.
    pub compressed_len: usize,
}

impl ChunkProgress {
    /// Percentage of the payload sent so far.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.end as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ChunkProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk {}-{}    ({:.2}%)    gzip length = {}",
            self.start,
            self.end,
            self.percent(),
            self.compressed_len
        )
    }
}

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransferReport {
    /// Everything the device sent back, in receipt order.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub compressed: Vec<u8>,
    /// Number of chunks written.
    pub chunks_sent: usize,
    /// Payload bytes written (header excluded).
    pub bytes_sent: usize,
    /// Wall-clock duration of the transfer.
    pub elapsed: Duration,
}

type CancelCheck = Box<dyn Fn() -> bool + Send>;

/// Compression request driver over a [`Port`].
///
/// The driver owns the port and closes it when the transfer ends, whether
/// it succeeded or not.
pub struct GzipOffload<P: Port> {
    port: P,
    config: TransferConfig,
    cancel: CancelCheck,
}

impl<P: Port> GzipOffload<P> {
    /// Create a driver over an already opened port.
    ///
    /// Cancellation follows the process-wide
    /// [`set_interrupt_checker`](crate::set_interrupt_checker) hook.
    pub fn new(port: P, config: TransferConfig) -> Self {
        Self {
            port,
            config,
            cancel: Box::new(crate::is_interrupted_requested),
        }
    }

    /// Replace the cancellation check consulted between chunks.
    #[must_use]
    pub fn with_cancel_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.cancel = Box::new(check);
        self
    }

    /// Send `payload` to the device and collect the compressed stream.
    ///
    /// `progress` is called once per chunk after its drain phase. The port
    /// is closed before this returns, on every path.
    pub fn compress<F>(mut self, payload: &[u8], mut progress: F) -> Result<TransferReport>
    where
        F: FnMut(&ChunkProgress),
    {
        let result = self.run(payload, &mut progress);

        if let Err(e) = self.port.close() {
            warn!("Failed to close {}: {e}", self.port.name());
        }

        if let Err(e) = &result {
            debug!("Transfer on {} failed: {e}", self.port.name());
        }
        result
    }

    fn run<F>(&mut self, payload: &[u8], progress: &mut F) -> Result<TransferReport>
    where
        F: FnMut(&ChunkProgress),
    {
        self.config.validate()?;
        let header = RequestHeader::for_payload(payload.len())?;

        let start = Instant::now();
        let total = payload.len();
        let chunks = Chunks::new(payload, self.config.chunk_size);
        let chunk_total = chunks.len();

        info!(
            "Sending {total} bytes to {} in {chunk_total} chunks of up to {} bytes",
            self.port.name(),
            self.config.chunk_size
        );

        let header_bytes = header.to_bytes();
        trace!("Header: {header_bytes:02X?}");
        self.port
            .write_all_bytes(&header_bytes)
            .map_err(Error::TransportWrite)?;

        // Gzip output is usually smaller than the input
        let mut compressed = Vec::with_capacity(total / 2 + 64);
        let mut buf = vec![0u8; self.config.read_buffer_size];

        if total == 0 {
            // No chunk will follow, so this is the only chance to hear back
            drain(&mut self.port, &mut buf, &mut compressed)?;
        }

        let mut bytes_sent = 0;
        for chunk in chunks {
            if (self.cancel)() {
                warn!("Transfer cancelled after {bytes_sent} of {total} bytes");
                return Err(Error::Cancelled);
            }

            self.port
                .write_all_bytes(chunk.data)
                .map_err(Error::TransportWrite)?;
            bytes_sent += chunk.len();

            let drained = drain(&mut self.port, &mut buf, &mut compressed)?;

            let observation = ChunkProgress {
                index: chunk.index,
                chunk_count: chunk_total,
                start: chunk.offset,
                end: chunk.end(),
                total,
                compressed_len: compressed.len(),
            };
            debug!("{observation}  (+{} bytes)", drained.bytes);
            progress(&observation);
        }

        if compressed.is_empty() {
            return Err(Error::EmptyResponse);
        }

        let elapsed = start.elapsed();
        info!(
            "Received {} compressed bytes in {:.2}s",
            compressed.len(),
            elapsed.as_secs_f64()
        );

        Ok(TransferReport {
            compressed,
            chunks_sent: chunk_total,
            bytes_sent,
            elapsed,
        })
    }
}

/// Run a transfer on a port produced by `open`.
///
/// The configuration and payload length are checked before `open` is
/// called, so an oversized payload never touches the device.
pub fn compress_with<P, O, F>(
    payload: &[u8],
    config: &TransferConfig,
    open: O,
    progress: F,
) -> Result<TransferReport>
where
    P: Port,
    O: FnOnce(&TransferConfig) -> Result<P>,
    F: FnMut(&ChunkProgress),
{
    config.validate()?;
    RequestHeader::for_payload(payload.len())?;

    let port = open(config)?;
    GzipOffload::new(port, config.clone()).compress(payload, progress)
}

/// Open `port_name` and run a transfer on it.
#[cfg(feature = "native")]
pub fn compress_on_port<F>(
    port_name: &str,
    payload: &[u8],
    config: &TransferConfig,
    progress: F,
) -> Result<TransferReport>
where
    F: FnMut(&ChunkProgress),
{
    compress_with(
        payload,
        config,
        |config| crate::port::NativePort::open(&config.serial_config(port_name)),
        progress,
    )
}
