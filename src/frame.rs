//! Wire framing: request encoding and the inbound byte-stream parser.
//!
//! ```text
//! 52 46 45 | 01 | group command | 02 | len | [03 | payload..] | 04 | xor
//! ```
//!
//! The payload marker is omitted when `len` is 0. The checksum is the XOR of
//! every byte from the first start byte through the checksum marker.

use crate::constants::{
    CHECKSUM_START_BYTE, COMMAND_START_BYTE, LENGTH_START_BYTE, PAYLOAD_START_BYTE, START_BYTE_1,
    START_BYTE_2, START_BYTE_3,
};

/// Pack a command group and command into the correlation key.
pub fn message_id(group: u8, command: u8) -> u16 {
    ((group as u16) << 8) | command as u16
}

pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// A validated frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub group: u8,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(group: u8, command: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            group,
            command,
            payload: payload.into(),
        }
    }

    pub fn message_id(&self) -> u16 {
        message_id(self.group, self.command)
    }

    /// Serialize to wire bytes. The payload must not exceed 255 bytes; the
    /// length byte is truncated otherwise.
    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len();
        let mut out = Vec::with_capacity(11 + len);
        out.extend_from_slice(&[
            START_BYTE_1,
            START_BYTE_2,
            START_BYTE_3,
            COMMAND_START_BYTE,
            self.group,
            self.command,
            LENGTH_START_BYTE,
            len as u8,
        ]);
        if len > 0 {
            out.push(PAYLOAD_START_BYTE);
            out.extend_from_slice(&self.payload);
        }
        out.push(CHECKSUM_START_BYTE);
        out.push(xor_checksum(&out));
        out
    }
}

/// Build the wire bytes of a request.
pub fn create_command(group: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    Frame::new(group, command, payload).encode()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    StartByte1,
    StartByte2,
    StartByte3,
    CommandStart,
    Command1,
    Command2,
    LengthStart,
    Length,
    PayloadStart,
    Payload,
    ChecksumStart,
    Checksum,
}

/// Outcome of a completed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Frame(Frame),
    /// Frame was complete but its checksum did not match; it is discarded.
    BadChecksum { computed: u8, received: u8 },
}

/// Byte-at-a-time frame parser.
///
/// Any byte that does not match the marker expected in the current state
/// resets the parser to look for the first start byte. The offending byte is
/// not re-examined, so a start sequence that begins inside a broken frame is
/// missed.
#[derive(Debug)]
pub struct FrameParser {
    state: ParseState,
    raw: Vec<u8>,
    group: u8,
    command: u8,
    length: usize,
    payload: Vec<u8>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StartByte1,
            raw: Vec::with_capacity(16),
            group: 0,
            command: 0,
            length: 0,
            payload: Vec::new(),
        }
    }

    /// True while no frame is partially assembled.
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::StartByte1
    }

    fn expect(&mut self, byte: u8, marker: u8, next: ParseState) {
        if byte == marker {
            self.raw.push(byte);
            self.state = next;
        } else {
            self.state = ParseState::StartByte1;
        }
    }

    /// Feed one byte. Returns a result when a frame has been completed.
    pub fn push(&mut self, byte: u8) -> Option<Parsed> {
        match self.state {
            ParseState::StartByte1 => {
                if byte == START_BYTE_1 {
                    self.raw.clear();
                    self.payload.clear();
                    self.length = 0;
                    self.raw.push(byte);
                    self.state = ParseState::StartByte2;
                }
            }
            ParseState::StartByte2 => self.expect(byte, START_BYTE_2, ParseState::StartByte3),
            ParseState::StartByte3 => self.expect(byte, START_BYTE_3, ParseState::CommandStart),
            ParseState::CommandStart => {
                self.expect(byte, COMMAND_START_BYTE, ParseState::Command1)
            }
            ParseState::Command1 => {
                self.group = byte;
                self.raw.push(byte);
                self.state = ParseState::Command2;
            }
            ParseState::Command2 => {
                self.command = byte;
                self.raw.push(byte);
                self.state = ParseState::LengthStart;
            }
            ParseState::LengthStart => self.expect(byte, LENGTH_START_BYTE, ParseState::Length),
            ParseState::Length => {
                self.length = byte as usize;
                self.raw.push(byte);
                self.state = if self.length == 0 {
                    ParseState::ChecksumStart
                } else {
                    ParseState::PayloadStart
                };
            }
            ParseState::PayloadStart => {
                self.expect(byte, PAYLOAD_START_BYTE, ParseState::Payload)
            }
            ParseState::Payload => {
                self.payload.push(byte);
                self.raw.push(byte);
                if self.payload.len() >= self.length {
                    self.state = ParseState::ChecksumStart;
                }
            }
            ParseState::ChecksumStart => {
                self.expect(byte, CHECKSUM_START_BYTE, ParseState::Checksum)
            }
            ParseState::Checksum => {
                self.state = ParseState::StartByte1;
                let computed = xor_checksum(&self.raw);
                if computed != byte {
                    return Some(Parsed::BadChecksum {
                        computed,
                        received: byte,
                    });
                }
                let payload = std::mem::take(&mut self.payload);
                return Some(Parsed::Frame(Frame::new(self.group, self.command, payload)));
            }
        }
        None
    }
}
