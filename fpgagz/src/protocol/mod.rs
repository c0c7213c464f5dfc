//! Wire protocol spoken with the FPGA compressor.

pub mod header;

// Re-export common types
pub use header::{HEADER_LEN, HEADER_MAGIC, MAX_PAYLOAD_LEN, RequestHeader};
