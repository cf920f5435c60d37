//! Cyclic inventory event payload decoding.
//!
//! The payload is a sequence of tagged fields. Each field starts with a one
//! byte tag (see [`inventory_field`]); bytes that are not a known tag are
//! skipped while looking for the next field.

use crate::constants::inventory_field;

/// Memory contents reported alongside an inventoried tag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagMemory {
    pub bank: u8,
    pub address: u16,
    pub data: Vec<u8>,
}

/// One tag observed during cyclic inventory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagEvent {
    pub tag_id: Vec<u8>,
    pub antenna_id: Option<u8>,
    pub rssi: Option<[u8; 2]>,
    /// Read frequency in kHz
    pub read_frequency: Option<u32>,
    pub memory: Option<TagMemory>,
    pub trigger: Option<u8>,
    pub handle: Option<[u8; 2]>,
    pub state: Option<u16>,
    pub battery: Option<u8>,
}

#[derive(Debug)]
enum FieldState {
    Seek,
    TagIdLength,
    TagId { len: usize, id: Vec<u8> },
    Rssi1,
    Rssi2(u8),
    MemBank,
    MemAddr1 { bank: u8 },
    MemAddr2 { bank: u8, high: u8 },
    MemSize { bank: u8, address: u16 },
    MemData { memory: TagMemory, len: usize },
    Trigger,
    Antenna,
    Frequency { value: u32, seen: u8 },
    Handle1,
    Handle2(u8),
    State1,
    State2(u8),
    Battery,
}

fn seek(byte: u8) -> FieldState {
    match byte {
        inventory_field::TAG_ID => FieldState::TagIdLength,
        inventory_field::RSSI => FieldState::Rssi1,
        inventory_field::USER_MEMORY => FieldState::MemBank,
        inventory_field::TRIGGER => FieldState::Trigger,
        inventory_field::ANTENNA_ID => FieldState::Antenna,
        inventory_field::READ_FREQUENCY => FieldState::Frequency { value: 0, seen: 0 },
        inventory_field::GEN2_HANDLE => FieldState::Handle1,
        inventory_field::STATE => FieldState::State1,
        inventory_field::BATTERY => FieldState::Battery,
        _ => FieldState::Seek,
    }
}

/// Decode a cyclic inventory payload.
///
/// Returns `None` when the payload carries no tag id, or a zero-length one;
/// the reader uses such events to mark the end of a round. Fields cut short
/// by the end of the payload are left unset.
pub fn parse_inventory_event(payload: &[u8]) -> Option<TagEvent> {
    let mut event = TagEvent::default();
    let mut state = FieldState::Seek;

    for &byte in payload {
        state = match state {
            FieldState::Seek => seek(byte),
            FieldState::TagIdLength => {
                if byte == 0 {
                    event.tag_id.clear();
                    FieldState::Seek
                } else {
                    FieldState::TagId {
                        len: byte as usize,
                        id: Vec::with_capacity(byte as usize),
                    }
                }
            }
            FieldState::TagId { len, mut id } => {
                id.push(byte);
                if id.len() == len {
                    event.tag_id = id;
                    FieldState::Seek
                } else {
                    FieldState::TagId { len, id }
                }
            }
            FieldState::Rssi1 => FieldState::Rssi2(byte),
            FieldState::Rssi2(first) => {
                event.rssi = Some([first, byte]);
                FieldState::Seek
            }
            FieldState::MemBank => FieldState::MemAddr1 { bank: byte },
            FieldState::MemAddr1 { bank } => FieldState::MemAddr2 { bank, high: byte },
            FieldState::MemAddr2 { bank, high } => FieldState::MemSize {
                bank,
                address: u16::from_be_bytes([high, byte]),
            },
            FieldState::MemSize { bank, address } => {
                let memory = TagMemory {
                    bank,
                    address,
                    data: Vec::with_capacity(byte as usize),
                };
                if byte == 0 {
                    event.memory = Some(memory);
                    FieldState::Seek
                } else {
                    FieldState::MemData {
                        memory,
                        len: byte as usize,
                    }
                }
            }
            FieldState::MemData { mut memory, len } => {
                memory.data.push(byte);
                if memory.data.len() == len {
                    event.memory = Some(memory);
                    FieldState::Seek
                } else {
                    FieldState::MemData { memory, len }
                }
            }
            FieldState::Trigger => {
                event.trigger = Some(byte);
                FieldState::Seek
            }
            FieldState::Antenna => {
                event.antenna_id = Some(byte);
                FieldState::Seek
            }
            FieldState::Frequency { value, seen } => {
                let value = (value << 8) | byte as u32;
                if seen == 2 {
                    event.read_frequency = Some(value);
                    FieldState::Seek
                } else {
                    FieldState::Frequency {
                        value,
                        seen: seen + 1,
                    }
                }
            }
            FieldState::Handle1 => FieldState::Handle2(byte),
            FieldState::Handle2(first) => {
                event.handle = Some([first, byte]);
                FieldState::Seek
            }
            FieldState::State1 => FieldState::State2(byte),
            FieldState::State2(high) => {
                event.state = Some(u16::from_be_bytes([high, byte]));
                FieldState::Seek
            }
            FieldState::Battery => {
                event.battery = Some(byte);
                FieldState::Seek
            }
        };
    }

    if event.tag_id.is_empty() {
        return None;
    }
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_id_and_rssi() {
        let event = parse_inventory_event(&[0x01, 0x02, 0xAB, 0xCD, 0x02, 0x11, 0x22]).unwrap();
        assert_eq!(event.tag_id, vec![0xAB, 0xCD]);
        assert_eq!(event.rssi, Some([0x11, 0x22]));
        assert_eq!(event.antenna_id, None);
    }

    #[test]
    fn test_all_fields() {
        let payload = [
            0x01, 0x04, 0x30, 0x08, 0x33, 0xB2, // tag id
            0x05, 0x02, // antenna
            0x06, 0x0D, 0x3E, 0x1C, // frequency 867868 kHz
            0x03, 0x03, 0x00, 0x10, 0x02, 0xDE, 0xAD, // user memory
            0x04, 0x01, // trigger
            0x07, 0x9A, 0xBC, // handle
            0x08, 0x01, 0x02, // state
            0x09, 0x64, // battery
        ];
        let event = parse_inventory_event(&payload).unwrap();
        assert_eq!(event.tag_id, vec![0x30, 0x08, 0x33, 0xB2]);
        assert_eq!(event.antenna_id, Some(2));
        assert_eq!(event.read_frequency, Some(0x0D3E1C));
        assert_eq!(
            event.memory,
            Some(TagMemory {
                bank: 3,
                address: 0x0010,
                data: vec![0xDE, 0xAD],
            })
        );
        assert_eq!(event.trigger, Some(1));
        assert_eq!(event.handle, Some([0x9A, 0xBC]));
        assert_eq!(event.state, Some(0x0102));
        assert_eq!(event.battery, Some(0x64));
        assert_eq!(event.rssi, None);
    }

    #[test]
    fn test_no_tag_id_is_not_delivered() {
        assert_eq!(parse_inventory_event(&[0x02, 0x11, 0x22, 0x05, 0x01]), None);
        assert_eq!(parse_inventory_event(&[]), None);
    }

    #[test]
    fn test_zero_length_tag_id_is_end_marker() {
        assert_eq!(parse_inventory_event(&[0x01, 0x00, 0x05, 0x01]), None);
    }

    #[test]
    fn test_unknown_bytes_are_skipped() {
        let event =
            parse_inventory_event(&[0xFF, 0x00, 0x01, 0x01, 0x42, 0xEE, 0x09, 0x10]).unwrap();
        assert_eq!(event.tag_id, vec![0x42]);
        assert_eq!(event.battery, Some(0x10));
    }

    #[test]
    fn test_zero_length_memory_completes_immediately() {
        let event =
            parse_inventory_event(&[0x03, 0x03, 0x00, 0x00, 0x00, 0x01, 0x01, 0x77]).unwrap();
        assert_eq!(event.tag_id, vec![0x77]);
        assert_eq!(event.memory.map(|m| m.data), Some(vec![]));
    }

    #[test]
    fn test_truncated_field_is_left_unset() {
        let event = parse_inventory_event(&[0x01, 0x01, 0x42, 0x06, 0x0D, 0x3E]).unwrap();
        assert_eq!(event.read_frequency, None);
        assert_eq!(parse_inventory_event(&[0x01, 0x03, 0x42, 0x43]), None);
    }
}
