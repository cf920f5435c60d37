//! Error types for the protocol engine and the tag-data codec.

use crate::constants::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the reader
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// Transport layer error (serial port, etc.)
    #[error("transport error: {0}")]
    Transport(String),

    /// No response arrived within the command's timeout
    #[error("no response to {0}")]
    Timeout(String),

    /// The reader answered with a non-success status code
    #[error("reader returned {0}")]
    Status(StatusCode),

    /// Invalid response received from the reader
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid parameter passed to a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Failure while decoding or encoding tag memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The required bytes could not be obtained from, or written to, the reader.
    #[error("tag i/o failed: {0}")]
    Io(String),

    /// The bytes were obtained but do not form a valid TID or EPC.
    #[error("invalid tag data: {0}")]
    Invalid(String),
}

/// Reasons why no serial could be derived from a TID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum McsError {
    #[error("TID carries no unique serial")]
    NoSerial,

    #[error(
        "no serialization rule for MDID {mdid:#05X}, TMN {tmn:#05X} with {serial_len}-byte serial"
    )]
    UnsupportedChip {
        mdid: u16,
        tmn: u16,
        serial_len: usize,
    },

    #[error("MDID {0:#05X} has no vendor code")]
    UnknownVendor(u16),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
