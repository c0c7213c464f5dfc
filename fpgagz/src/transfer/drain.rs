//! Drain phase: collect device output until the line goes quiet.
//!
//! The compressor is a pipeline with no per-chunk acknowledgment and no
//! length prefix on its output, so the only available boundary is time:
//! the drain ends on the first read that returns nothing within the port
//! timeout.
//!
//! ```text
//!             data
//!            +----+
//!            v    |
//!       +----------+  empty read  +------+   settle   +------+
//!  ---> | Draining | -----------> | Idle | ---------> | Done |
//!       +----------+              +------+            +------+
//! ```
//!
//! `Done` is a heuristic, not a proof. A device that is still working when
//! the timeout fires will have the rest of its output picked up by the next
//! chunk's drain, or lost if this was the last chunk. Fixing that needs a
//! framing change on the device side.

use {
    crate::error::{Error, Result},
    log::trace,
    std::io::{ErrorKind, Read},
};

/// Default size of a single bounded read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// State of a drain phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// Reads are still returning data.
    Draining,
    /// A read came back empty within the timeout.
    Idle,
    /// The phase is over.
    Done,
}

impl DrainState {
    /// Transition after a read that returned `len` bytes.
    #[must_use]
    pub fn after_read(self, len: usize) -> Self {
        match self {
            Self::Draining if len > 0 => Self::Draining,
            Self::Draining => Self::Idle,
            Self::Idle | Self::Done => Self::Done,
        }
    }

    /// Transition once no further reads are planned.
    #[must_use]
    pub fn settle(self) -> Self {
        match self {
            Self::Draining => Self::Draining,
            Self::Idle | Self::Done => Self::Done,
        }
    }
}

/// Outcome of one drain phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Bytes appended to the accumulator.
    pub bytes: usize,
    /// Reads that returned data.
    pub reads: usize,
}

/// Read from `port` into `acc` until a read comes back empty.
///
/// `buf` bounds the size of each read. Both `Ok(0)` and a `TimedOut` or
/// `WouldBlock` error count as an empty read; `Interrupted` reads are
/// retried. Anything else is a [`Error::TransportRead`].
pub fn drain<R: Read + ?Sized>(
    port: &mut R,
    buf: &mut [u8],
    acc: &mut Vec<u8>,
) -> Result<DrainSummary> {
    let mut state = DrainState::Draining;
    let mut summary = DrainSummary::default();

    while state != DrainState::Done {
        if state == DrainState::Idle {
            state = state.settle();
            continue;
        }

        let n = read_once(port, buf)?;
        if n > 0 {
            acc.extend_from_slice(&buf[..n]);
            summary.bytes += n;
            summary.reads += 1;
        }
        state = state.after_read(n);
    }

    trace!(
        "Drained {} bytes in {} reads",
        summary.bytes, summary.reads
    );
    Ok(summary)
}

/// Issue one bounded read, mapping timeouts to an empty result.
fn read_once<R: Read + ?Sized>(port: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match port.read(buf) {
            Ok(n) => {
                trace!("Read {n} bytes");
                return Ok(n);
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Ok(0);
            },
            Err(e) => return Err(Error::TransportRead(e)),
        }
    }
}
