//! Simulated compressor used by the unit tests.
//!
//! Unlike `Cursor<Vec<u8>>`, reads and writes are independent: bytes written
//! by the host are parsed like the FPGA does (header, then payload) and the
//! compressed output is queued for later reads. State lives behind an `Arc`
//! so a test can keep a probe after the engine consumed the port.

use {
    crate::{
        error::Result,
        port::Port,
        protocol::{HEADER_LEN, RequestHeader},
    },
    flate2::{Compression, write::GzEncoder},
    std::{
        collections::VecDeque,
        io::{self, Read, Write},
        sync::{Arc, Mutex, MutexGuard},
        time::Duration,
    },
};

/// Route library logs to the test harness. Safe to call repeatedly.
pub(crate) fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .try_init();
}

/// How the simulated device answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Gzip the payload as it streams in, like the real hardware.
    Gzip,
    /// Never produce any output.
    Silent,
}

pub(crate) struct DeviceState {
    pub behavior: Behavior,
    /// Every byte written by the host, header included.
    pub received: Vec<u8>,
    /// Size of each `write` call.
    pub writes: Vec<usize>,
    /// Number of `read` calls that returned data.
    pub data_reads: usize,
    /// Number of `read` calls that found nothing.
    pub empty_reads: usize,
    pub close_count: usize,
    /// Report "no data" as `Ok(0)` instead of a `TimedOut` error.
    pub empty_as_zero: bool,
    /// Hand out at most this many bytes per read.
    pub max_read: usize,
    /// Fail the n-th `write` call (0 = header).
    pub fail_write_at: Option<usize>,
    /// Fail the n-th `read` call.
    pub fail_read_at: Option<usize>,
    /// Return `Interrupted` from the first read.
    pub interrupt_first_read: bool,
    /// Hold back the output of each write until the next write arrives, so
    /// it is only seen by a later drain. Everything is released once the
    /// whole payload is in.
    pub lag_one_write: bool,
    reads: usize,
    header: Option<RequestHeader>,
    payload_received: usize,
    encoder: Option<GzEncoder<Vec<u8>>>,
    pending: VecDeque<u8>,
    held: Vec<u8>,
    timeout: Duration,
}

impl DeviceState {
    /// Payload bytes received after the header.
    pub fn payload(&self) -> &[u8] {
        self.received
            .get(HEADER_LEN..)
            .unwrap_or_default()
    }

    /// Header as parsed by the device, once complete.
    pub fn header(&self) -> Option<RequestHeader> {
        self.header
    }

    fn accept(&mut self, data: &[u8]) {
        let released = std::mem::take(&mut self.held);
        self.pending
            .extend(released);

        let before = self
            .received
            .len();
        self.received
            .extend_from_slice(data);

        if self
            .header
            .is_none()
        {
            if self
                .received
                .len()
                < HEADER_LEN
            {
                return;
            }
            let header = RequestHeader::parse(&self.received[..HEADER_LEN])
                .expect("host must send a valid header first");
            self.header = Some(header);
            self.encoder = Some(GzEncoder::new(Vec::new(), Compression::default()));
        }

        let payload_start = before.max(HEADER_LEN);
        let fresh = self.received[payload_start..].to_vec();
        self.payload_received += fresh.len();

        if self.behavior == Behavior::Silent {
            return;
        }

        let expected = self
            .header
            .map_or(0, |h| h.payload_len());
        let Some(encoder) = self
            .encoder
            .as_mut()
        else {
            return;
        };
        encoder
            .write_all(&fresh)
            .expect("in-memory gzip");
        let produced = std::mem::take(encoder.get_mut());

        if self.payload_received >= expected {
            self.pending
                .extend(produced);
            if let Some(encoder) = self
                .encoder
                .take()
            {
                let tail = encoder
                    .finish()
                    .expect("in-memory gzip");
                self.pending
                    .extend(tail);
            }
        } else if self.lag_one_write {
            self.held = produced;
        } else {
            self.pending
                .extend(produced);
        }
    }
}

/// Handle to a simulated compressor.
#[derive(Clone)]
pub(crate) struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                behavior,
                received: Vec::new(),
                writes: Vec::new(),
                data_reads: 0,
                empty_reads: 0,
                close_count: 0,
                empty_as_zero: false,
                max_read: usize::MAX,
                fail_write_at: None,
                fail_read_at: None,
                interrupt_first_read: false,
                lag_one_write: false,
                reads: 0,
                header: None,
                payload_received: 0,
                encoder: None,
                pending: VecDeque::new(),
                held: Vec::new(),
                timeout: Duration::from_millis(1000),
            })),
        }
    }

    pub fn gzip() -> Self {
        Self::new(Behavior::Gzip)
    }

    pub fn silent() -> Self {
        Self::new(Behavior::Silent)
    }

    /// Adjust the simulated device before handing it to the engine.
    pub fn configure(self, f: impl FnOnce(&mut DeviceState)) -> Self {
        f(&mut self.state());
        self
    }

    /// Inspect the device state.
    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state
            .lock()
            .expect("device state poisoned")
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        let call = state.reads;
        state.reads += 1;

        if state.interrupt_first_read && call == 0 {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        }
        if state.fail_read_at == Some(call) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        if state
            .pending
            .is_empty()
        {
            state.empty_reads += 1;
            return if state.empty_as_zero {
                Ok(0)
            } else {
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            };
        }

        let n = buf
            .len()
            .min(state.max_read)
            .min(
                state
                    .pending
                    .len(),
            );
        for b in buf
            .iter_mut()
            .take(n)
        {
            *b = state
                .pending
                .pop_front()
                .expect("length checked above");
        }
        state.data_reads += 1;
        Ok(n)
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        let call = state
            .writes
            .len();
        if state.fail_write_at == Some(call) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        state
            .writes
            .push(buf.len());
        state.accept(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for SimulatedDevice {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.state().timeout = timeout;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.state().timeout
    }

    fn name(&self) -> &str {
        "sim0"
    }

    fn close(&mut self) -> Result<()> {
        self.state().close_count += 1;
        Ok(())
    }
}
