//! [`ReaderLowLevel`] backend on top of the framed reader protocol.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::error::ReaderError;
use crate::low_level::ReaderLowLevel;
use crate::pump::ReceivePump;
use crate::reader::ProtocolHandler;
use crate::transport::RfidTransport;
use crate::types::{MemoryBank, TagToken};

const NO_PASSWORD: [u8; 4] = [0; 4];

pub struct RfeReader<T: RfidTransport + Send + 'static> {
    handler: Arc<ProtocolHandler<T>>,
    pump: Option<ReceivePump>,
    spawn_pump: bool,
    ready: bool,
}

impl<T: RfidTransport + Send + 'static> RfeReader<T> {
    /// Wrap a handler. The receive thread is started by
    /// [`initialize`](ReaderLowLevel::initialize).
    pub fn new(handler: Arc<ProtocolHandler<T>>) -> Self {
        Self {
            handler,
            pump: None,
            spawn_pump: true,
            ready: false,
        }
    }

    /// Wrap a handler whose inbound bytes are delivered by the caller
    /// through [`ProtocolHandler::handle_received`].
    pub fn without_pump(handler: Arc<ProtocolHandler<T>>) -> Self {
        Self {
            handler,
            pump: None,
            spawn_pump: false,
            ready: false,
        }
    }

    pub fn handler(&self) -> &Arc<ProtocolHandler<T>> {
        &self.handler
    }

    fn word_address(offset: usize) -> Result<u16, ReaderError> {
        if offset % 2 != 0 {
            return Err(ReaderError::InvalidParameter(format!(
                "byte offset {} is not word aligned",
                offset
            )));
        }
        u16::try_from(offset / 2).map_err(|_| {
            ReaderError::InvalidParameter(format!("byte offset {} out of range", offset))
        })
    }
}

impl<T: RfidTransport + Send + 'static> ReaderLowLevel for RfeReader<T> {
    type Error = ReaderError;

    fn initialize(&mut self) -> Result<(), ReaderError> {
        if self.ready {
            return Ok(());
        }
        if self.spawn_pump && self.pump.is_none() {
            self.handler.clear_input()?;
            let pump = ReceivePump::spawn(Arc::clone(&self.handler))
                .map_err(|e| ReaderError::Transport(e.to_string()))?;
            self.pump = Some(pump);
        }
        let info = self.handler.reader_info()?;
        info!(
            "reader 0x{:08X} ready, software 0x{:08X}, state {:?}",
            info.reader_id, info.software_revision, info.current_state
        );
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn chunk_size(&self) -> Option<usize> {
        None
    }

    fn singulate_tag(&mut self) -> Option<TagToken> {
        if !self.ready {
            if let Err(e) = self.initialize() {
                warn!("reader initialisation failed: {}", e);
            }
            return None;
        }
        match self.handler.do_single_inventory() {
            Ok(epcs) => epcs.into_iter().next().map(TagToken::new),
            Err(e) => {
                debug!("single inventory failed: {}", e);
                None
            }
        }
    }

    fn read_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        count: usize,
    ) -> Result<Vec<u8>, ReaderError> {
        let address = Self::word_address(offset)?;
        let count = u8::try_from(count)
            .map_err(|_| ReaderError::InvalidParameter(format!("{} bytes in one read", count)))?;
        self.handler
            .read_from_tag(tag.as_bytes(), bank, address, &NO_PASSWORD, count)
    }

    fn write_bytes(
        &mut self,
        tag: &TagToken,
        bank: MemoryBank,
        offset: usize,
        data: &[u8],
    ) -> Result<(), ReaderError> {
        let address = Self::word_address(offset)?;
        self.handler
            .write_to_tag(tag.as_bytes(), bank, address, &NO_PASSWORD, data)
    }
}
