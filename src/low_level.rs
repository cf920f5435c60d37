//! Byte-level tag memory access used by the codec.

use std::fmt;

use crate::types::{MemoryBank, TagToken};

/// A reader able to singulate a tag and move bytes in and out of its memory
/// banks. Offsets and counts are in bytes; implementations translate to
/// word addressing where their protocol needs it.
pub trait ReaderLowLevel {
    type Error: fmt::Debug;

    fn initialize(&mut self) -> Result<(), Self::Error>;

    fn is_ready(&self) -> bool;

    /// Largest transfer the reader handles in one call, or `None` when
    /// transfers are not limited.
    fn chunk_size(&self) -> Option<usize>;

    /// Select a single tag in the field, if any.
    fn singulate_tag(&mut self) -> Option<TagToken>;

    fn read_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        count: usize,
    ) -> Result<Vec<u8>, Self::Error>;

    fn write_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}
