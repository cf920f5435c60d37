//! Test doubles: an in-memory tag population and a scripted transport.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::frame::{Frame, message_id};
use crate::low_level::ReaderLowLevel;
use crate::transport::RfidTransport;
use crate::types::{MemoryBank, TagToken, hex_to_bytes};

/// Memory banks of one simulated tag
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTag {
    pub(crate) tid: Vec<u8>,
    /// Whole EPC bank: CRC, PC, EPC
    pub(crate) epc: Vec<u8>,
    pub(crate) user: Vec<u8>,
}

impl MockTag {
    pub(crate) fn from_hex(tid: &str, epc: &str) -> Self {
        Self {
            tid: hex_to_bytes(tid).expect("tid hex"),
            epc: hex_to_bytes(epc).expect("epc hex"),
            user: Vec::new(),
        }
    }

    fn bank(&self, bank: MemoryBank) -> Option<&Vec<u8>> {
        match bank {
            MemoryBank::Tid => Some(&self.tid),
            MemoryBank::Epc => Some(&self.epc),
            MemoryBank::User => Some(&self.user),
            MemoryBank::Reserved => None,
        }
    }

    fn bank_mut(&mut self, bank: MemoryBank) -> Option<&mut Vec<u8>> {
        match bank {
            MemoryBank::Tid => Some(&mut self.tid),
            MemoryBank::Epc => Some(&mut self.epc),
            MemoryBank::User => Some(&mut self.user),
            MemoryBank::Reserved => None,
        }
    }
}

/// Reader over a fixed tag population. Tokens are tag indices.
#[derive(Debug, Default)]
pub(crate) struct MockReader {
    pub(crate) tags: Vec<MockTag>,
    pub(crate) chunk: Option<usize>,
    pub(crate) ready: bool,
    pub(crate) next: usize,
    /// Every write as (bank, offset, data)
    pub(crate) writes: Vec<(MemoryBank, usize, Vec<u8>)>,
    /// Return this many fewer bytes than requested
    pub(crate) short_reads: usize,
}

impl MockReader {
    pub(crate) fn new(tags: Vec<MockTag>) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    pub(crate) fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = Some(chunk);
        self
    }

    pub(crate) fn token(index: usize) -> TagToken {
        TagToken::new(vec![index as u8])
    }

    fn tag_mut(&mut self, tag: &TagToken) -> Result<&mut MockTag, String> {
        let index = *tag.as_bytes().first().ok_or("empty token")? as usize;
        self.tags.get_mut(index).ok_or_else(|| format!("no tag {}", index))
    }

    fn check_chunk(&self, count: usize) -> Result<(), String> {
        match self.chunk {
            Some(chunk) if count > chunk => {
                Err(format!("{} bytes exceed chunk of {}", count, chunk))
            }
            _ => Ok(()),
        }
    }
}

impl ReaderLowLevel for MockReader {
    type Error = String;

    fn initialize(&mut self) -> Result<(), String> {
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn chunk_size(&self) -> Option<usize> {
        self.chunk
    }

    fn singulate_tag(&mut self) -> Option<TagToken> {
        if self.next >= self.tags.len() {
            return None;
        }
        self.next += 1;
        Some(Self::token(self.next - 1))
    }

    fn read_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        count: usize,
    ) -> Result<Vec<u8>, String> {
        self.check_chunk(count)?;
        let short = self.short_reads;
        let memory = self.tag_mut(tag)?.bank(bank).ok_or("bank not readable")?;
        let end = offset + count;
        if end > memory.len() {
            return Err(format!("read {}..{} past end of {} bytes", offset, end, memory.len()));
        }
        Ok(memory[offset..end - short.min(count)].to_vec())
    }

    fn write_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        data: &[u8],
    ) -> Result<(), String> {
        self.check_chunk(data.len())?;
        let memory = self.tag_mut(tag)?.bank_mut(bank).ok_or("bank not writable")?;
        let end = offset + data.len();
        if end > memory.len() {
            return Err(format!("write {}..{} past end of {} bytes", offset, end, memory.len()));
        }
        memory[offset..end].copy_from_slice(data);
        self.writes.push((bank, offset, data.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    written: Vec<Vec<u8>>,
    replies: HashMap<u16, VecDeque<Vec<Frame>>>,
    inbound: VecDeque<u8>,
    fail_writes: bool,
}

/// Transport that records requests and, when a request matches a scripted
/// command, queues the scripted reply frames for reading.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer the next request for `group`/`command` with `frames`.
    pub(crate) fn on(&self, group: u8, command: u8, frames: Vec<Frame>) {
        self.script
            .lock()
            .replies
            .entry(message_id(group, command))
            .or_default()
            .push_back(frames);
    }

    /// Make bytes available to read without a request.
    pub(crate) fn push_inbound(&self, bytes: &[u8]) {
        self.script.lock().inbound.extend(bytes);
    }

    pub(crate) fn fail_writes(&self) {
        self.script.lock().fail_writes = true;
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.script.lock().written.clone()
    }
}

impl RfidTransport for ScriptedTransport {
    type Error = std::io::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut script = self.script.lock();
        if script.fail_writes {
            return Err(std::io::Error::other("port closed"));
        }
        script.written.push(data.to_vec());
        if data.len() >= 6 {
            let id = message_id(data[4], data[5]);
            let frames = script.replies.get_mut(&id).and_then(VecDeque::pop_front);
            for frame in frames.into_iter().flatten() {
                let encoded = frame.encode();
                script.inbound.extend(encoded);
            }
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        {
            let mut script = self.script.lock();
            if !script.inbound.is_empty() {
                let n = buf.len().min(script.inbound.len());
                for (slot, byte) in buf.iter_mut().zip(script.inbound.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }
        thread::sleep(Duration::from_millis(timeout_ms as u64));
        Ok(0)
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.script.lock().inbound.clear();
        Ok(())
    }
}
