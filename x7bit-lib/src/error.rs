use std::io;
use thiserror::Error;

/// The primary error type for the `x7bit` library.
#[derive(Error, Debug)]
pub enum X7Error {
    #[error("malformed bitstream header: {0}")]
    MalformedHeader(String),

    #[error("no sync word found in bitstream data")]
    SyncNotFound,

    #[error("bitstream data ends mid-packet at offset {offset}")]
    TruncatedPacket { offset: usize },

    #[error("unknown packet type {packet_type} at offset {offset}")]
    UnknownPacketType { packet_type: u32, offset: usize },

    #[error("IDCODE mismatch: expected {expected:#010x}, found {found:?}")]
    IdCodeMismatch { expected: u32, found: Option<u32> },

    #[error("index {index} out of range (limit {limit})")]
    OutOfRange { index: usize, limit: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no device known for IDCODE {idcode:#010x}")]
    UnknownDevice { idcode: u32 },

    #[error("unsupported bitstream: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
