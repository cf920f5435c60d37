//! Writing SGTIN-96 EPCs to tags.

use log::debug;

use crate::decoder::EPC_START;
use crate::error::CodecError;
use crate::low_level::ReaderLowLevel;
use crate::sgtin::{self, SGTIN96_LEN};
use crate::tag_data::TagEpcSgtin;
use crate::types::{MemoryBank, TagToken, bytes_to_hex};

const PC_UMI: u8 = 0x04;

/// EPC bank image of an SGTIN-96: CRC placeholder, PC announcing six words
/// with user memory, then the EPC.
pub fn encode_epc_bank(epc: &TagEpcSgtin) -> Result<[u8; EPC_START + SGTIN96_LEN], CodecError> {
    let mut bank = [0u8; EPC_START + SGTIN96_LEN];
    bank[2] = (((SGTIN96_LEN / 2) as u8) << 3) | PC_UMI;
    bank[EPC_START..].copy_from_slice(&sgtin::encode(epc)?);
    Ok(bank)
}

/// Write `epc` into the EPC bank of `tag`, leaving CRC and PC untouched.
///
/// The EPC goes out in a single write unless the reader limits the transfer
/// size, in which case it is split into consecutive writes of at most that
/// many bytes.
pub fn write_epc<R: ReaderLowLevel + ?Sized>(
    reader: &mut R,
    tag: &TagToken,
    epc: &TagEpcSgtin,
) -> Result<(), CodecError> {
    let bank = encode_epc_bank(epc)?;
    let payload = &bank[EPC_START..];
    debug!("writing EPC {} ({})", bytes_to_hex(payload), epc.tag_uri());

    let chunk = match reader.chunk_size() {
        Some(chunk) if chunk > 0 => chunk,
        _ => payload.len(),
    };
    for (index, part) in payload.chunks(chunk).enumerate() {
        let offset = EPC_START + index * chunk;
        reader
            .write_bytes(tag, MemoryBank::Epc, offset, part)
            .map_err(|e| CodecError::Io(format!("write EPC {}+{}: {:?}", offset, part.len(), e)))?;
    }
    Ok(())
}
