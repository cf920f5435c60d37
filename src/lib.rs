//! Protocol engine for RF-embedded UHF RFID readers, with EPC and TID
//! decoding on top.
//!
//! # Features
//!
//! - `serial` - Serial port transport for desktop using serialport crate
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use uhf_interrogator::{
//!     DEFAULT_BAUD_RATE, ProtocolHandler, ReaderLowLevel, RfeReader, SerialTransport,
//! };
//! use uhf_interrogator::{decoder, encoder, mcs};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//! let mut reader = RfeReader::new(Arc::new(ProtocolHandler::new(transport)));
//! reader.initialize()?;
//!
//! if let Some(tag) = reader.singulate_tag() {
//!     let tid = decoder::read_tid(&mut reader, &tag)?;
//!     let template = decoder::read_epc_sgtin(&mut reader, &tag)?;
//!     let epc = mcs::generate_epc(&tid, &template)?;
//!     encoder::write_epc(&mut reader, &tag, &epc)?;
//!     println!("commissioned {}", epc.tag_uri());
//! }
//! ```

mod config;
pub mod constants;
mod dispatch;
mod error;
mod events;
mod frame;
mod inventory;
mod low_level;
mod pump;
mod queue;
mod reader;
mod rfe_reader;
mod tag_data;
mod trace;
mod transport;
mod types;

pub mod decoder;
pub mod encoder;
pub mod gtin;
pub mod mcs;
pub mod sgtin;

#[cfg(feature = "serial")]
mod serial;

#[cfg(test)]
mod mock;

// Re-exports
pub use config::{DEFAULT_TRACE_TARGET, ProtocolConfig};
pub use constants::{CurrentSystem, HeartbeatMode, ReaderState, StatusCode};
pub use error::{CodecError, McsError, ReaderError, Result};
pub use events::{
    ChannelListener, DEFAULT_EVENT_CAPACITY, InterruptListener, NoopListener, ReaderEvent,
};
pub use frame::{Frame, FrameParser, Parsed, create_command, message_id, xor_checksum};
pub use inventory::{TagEvent, TagMemory, parse_inventory_event};
pub use low_level::ReaderLowLevel;
pub use pump::ReceivePump;
pub use queue::MessageQueue;
pub use reader::ProtocolHandler;
pub use rfe_reader::RfeReader;
pub use tag_data::{EpcPc, SgtinIdentity, TagEpcSgtin, TagRaw, Tid};
pub use trace::{LogTrace, NullTrace, TraceSink};
pub use transport::RfidTransport;
pub use types::{
    AntennaSlot, Attenuation, FrequencyTable, GpioCaps, LbtParams, MemoryBank, ReaderInfo,
    Sensitivity, TagToken,
};

#[cfg(feature = "serial")]
pub use serial::{DEFAULT_BAUD_RATE, SerialTransport};
