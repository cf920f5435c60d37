//! Reading TID and EPC bank contents through a [`ReaderLowLevel`].

use log::debug;

use crate::error::CodecError;
use crate::low_level::ReaderLowLevel;
use crate::sgtin;
use crate::tag_data::{EpcPc, TagEpcSgtin, TagRaw, Tid};
use crate::types::{MemoryBank, TagToken, bytes_to_hex};

/// Allocation class of TIDs following the EPC tag data standard
pub const TID_CLASS_EPC: u8 = 0xE2;
/// Byte offset of the EPC in the EPC bank, after CRC and PC
pub const EPC_START: usize = 4;

const MDID_ALIEN: u16 = 0x003;
const MDID_NXP: u16 = 0x006;
const READ_CHUNK: usize = 4;

fn read_exact<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
    bank: MemoryBank,
    offset: usize,
    count: usize,
) -> Result<Vec<u8>, CodecError> {
    let bytes = reader
        .read_bytes(tag, bank, offset, count)
        .map_err(|e| CodecError::Io(format!("read {:?} {}+{}: {:?}", bank, offset, count, e)))?;
    if bytes.len() != count {
        return Err(CodecError::Io(format!(
            "read {:?} {}+{}: got {} bytes",
            bank,
            offset,
            count,
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn read_chunked<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
    bank: MemoryBank,
    offset: usize,
    len: usize,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let count = READ_CHUNK.min(len - out.len());
        out.extend(read_exact(reader, tag, bank, offset + out.len(), count)?);
    }
    Ok(out)
}

/// Read the TID bank and extract the chip's identity and, when available,
/// its factory serial.
///
/// Chips from vendors without a known serial layout decode successfully with
/// no serial. An extended TID that announces no serial segment is rejected.
pub fn read_tid<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
) -> Result<Tid, CodecError> {
    let short = read_exact(reader, tag, MemoryBank::Tid, 0, 4)?;
    if short[0] != TID_CLASS_EPC {
        return Err(CodecError::Invalid(format!("TID class 0x{:02X}", short[0])));
    }

    let mdid = ((short[1] as u16) << 4) | (short[2] >> 4) as u16;
    let tmn = (((short[2] & 0x0F) as u16) << 8) | short[3] as u16;
    let xtid = short[1] & 0x80 != 0;
    debug!("TID MDID {:03X} TMN {:03X} XTID {}", mdid, tmn, xtid);

    let mut tid = Tid {
        mdid,
        tmn,
        serial: None,
        stid_uri: None,
    };

    if xtid {
        let header = read_exact(reader, tag, MemoryBank::Tid, 4, 2)?;
        let header = u16::from_be_bytes([header[0], header[1]]);
        let serial_size = ((header >> 13) & 0x07) as usize;
        debug!("XTID header {:04X}, serial size {}", header, serial_size);
        if serial_size == 0 {
            return Err(CodecError::Invalid("XTID has no serial segment".into()));
        }
        let len = (48 + 16 * (serial_size - 1)) / 8;
        let serial = read_exact(reader, tag, MemoryBank::Tid, 6, len)?;
        tid.stid_uri = Some(format!(
            "urn:epc:stid:x{:03X}.x{:03X}.x{}",
            mdid,
            tmn,
            bytes_to_hex(&serial)
        ));
        tid.serial = Some(serial);
        return Ok(tid);
    }

    match mdid {
        MDID_ALIEN => {
            let model = (tmn >> 8) & 0x0F;
            let major = (tmn >> 4) & 0x0F;
            let minor = tmn & 0x0F;
            debug!("Alien model {:X}, revision {}.{}", model, major, minor);
            // Higgs-3
            if (model, major, minor) != (4, 1, 2) {
                return Err(CodecError::Invalid(format!("unsupported Alien TMN {:03X}", tmn)));
            }
            tid.serial = Some(read_exact(reader, tag, MemoryBank::Tid, 4, 8)?);
        }
        MDID_NXP => {
            let version = (tmn >> 4) & 0x3F;
            let subversion = (tmn & 0x0F) as u8;
            debug!("NXP version {}, subversion {}", version, subversion);
            let utid = read_exact(reader, tag, MemoryBank::Tid, 4, 4)?;
            let mut serial = Vec::with_capacity(5);
            serial.push(subversion);
            serial.extend(utid);
            tid.serial = Some(serial);
        }
        _ => {}
    }
    Ok(tid)
}

/// Read the CRC and protocol control word at the start of the EPC bank.
pub fn read_epc_pc<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
) -> Result<EpcPc, CodecError> {
    let b = read_exact(reader, tag, MemoryBank::Epc, 0, 4)?;
    Ok(EpcPc {
        crc: u16::from_be_bytes([b[0], b[1]]),
        epc_length: ((b[2] >> 3) & 0x1F) as usize * 2,
        umi: b[2] & 0x04 != 0,
        xi: b[2] & 0x02 != 0,
        toggle: b[2] & 0x01 != 0,
        attribs: b[3],
        xpc: 0,
    })
}

/// Read and decode an SGTIN-96 EPC.
pub fn read_epc_sgtin<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
) -> Result<TagEpcSgtin, CodecError> {
    let pc = read_epc_pc(reader, tag)?;
    let payload = read_chunked(reader, tag, MemoryBank::Epc, EPC_START, pc.epc_length)?;
    match payload.first() {
        Some(&sgtin::SGTIN96_HEADER) => {}
        Some(&header) => {
            return Err(CodecError::Invalid(format!("EPC header 0x{:02X} is not SGTIN-96", header)));
        }
        None => return Err(CodecError::Invalid("empty EPC".into())),
    }
    if payload.len() < sgtin::SGTIN96_LEN {
        return Err(CodecError::Invalid(format!("SGTIN-96 EPC of {} bytes", payload.len())));
    }
    let mut epc = sgtin::decode(&payload)?;
    epc.attribs = pc.attribs;
    Ok(epc)
}

/// Read the EPC bank without interpreting the EPC.
pub fn read_epc_raw<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
) -> Result<TagRaw, CodecError> {
    let pc = read_epc_pc(reader, tag)?;
    let data = read_chunked(reader, tag, MemoryBank::Epc, EPC_START, pc.epc_length)?;
    Ok(TagRaw { pc, data })
}

/// SGTIN pure identity URI of the tag, or its raw URI when the EPC is not
/// SGTIN-96.
pub fn read_epc_uri<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
) -> Result<String, CodecError> {
    match read_epc_sgtin(reader, tag) {
        Ok(epc) => Ok(epc.identity.uri()),
        Err(e) => {
            debug!("not SGTIN-96 ({}), falling back to raw URI", e);
            read_epc_raw(reader, tag).map(|raw| raw.uri())
        }
    }
}
