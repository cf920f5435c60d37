//! Inbound path: bytes to frames, frames to waiting callers or listeners.

use log::Level;
use std::sync::atomic::Ordering;

use crate::constants::{ReaderState, StatusCode, interrupt};
use crate::frame::{Frame, Parsed};
use crate::inventory::parse_inventory_event;
use crate::reader::ProtocolHandler;
use crate::transport::RfidTransport;

impl<T: RfidTransport> ProtocolHandler<T> {
    /// Feed bytes received from the transport.
    ///
    /// Completed frames are routed before this returns, on the calling
    /// thread. Listener callbacks therefore must not issue commands on this
    /// handler: the response could only arrive through this very call.
    pub fn handle_received(&self, data: &[u8]) {
        self.trace(Level::Trace, format_args!("<- {:02X?}", data));
        let mut parser = self.parser.lock();
        for &byte in data {
            match parser.push(byte) {
                Some(Parsed::Frame(frame)) => self.dispatch(frame),
                Some(Parsed::BadChecksum { computed, received }) => self.trace(
                    Level::Warn,
                    format_args!(
                        "dropped frame: checksum 0x{:02X}, expected 0x{:02X}",
                        received, computed
                    ),
                ),
                None => {}
            }
        }
    }

    fn dispatch(&self, frame: Frame) {
        self.trace(
            Level::Trace,
            format_args!(
                "frame {:02X}:{:02X} {:02X?}",
                frame.group, frame.command, frame.payload
            ),
        );
        if frame.group != interrupt::GROUP {
            self.responses.enqueue(frame.message_id(), frame.payload);
            return;
        }

        let payload = frame.payload.as_slice();
        match frame.command {
            interrupt::HEARTBEAT => match payload.split_first() {
                Some((&status, data)) if status == StatusCode::Success.as_u8() => {
                    self.listener.heartbeat(data)
                }
                _ => self.malformed("heartbeat", payload),
            },
            interrupt::INVENTORY_CYCLIC => {
                if self.block_cyclic.load(Ordering::Relaxed) {
                    return;
                }
                if let Some(event) = parse_inventory_event(payload) {
                    self.listener.cyclic_inventory(&event);
                }
            }
            interrupt::STATE_CHANGED => match payload {
                [state] => self.listener.state_changed(ReaderState::from_u8(*state)),
                _ => self.malformed("state changed", payload),
            },
            interrupt::STATUS_REG_CHANGED => match <[u8; 8]>::try_from(payload) {
                Ok(bytes) => self
                    .listener
                    .status_register_changed(u64::from_be_bytes(bytes)),
                Err(_) => self.malformed("status register", payload),
            },
            interrupt::GPIO_PINS_CHANGED => match <[u8; 4]>::try_from(payload) {
                Ok(bytes) => self.listener.gpio_values_changed(u32::from_be_bytes(bytes)),
                Err(_) => self.malformed("gpio", payload),
            },
            interrupt::OPERATION_RESULT => match payload.split_first() {
                Some((&pending_id, result)) if !result.is_empty() => {
                    self.pending.enqueue(pending_id, result.to_vec())
                }
                _ => self.malformed("operation result", payload),
            },
            _ => self.responses.enqueue(frame.message_id(), frame.payload),
        }
    }

    fn malformed(&self, kind: &str, payload: &[u8]) {
        self.trace(
            Level::Warn,
            format_args!("ignored {} interrupt {:02X?}", kind, payload),
        );
    }
}
