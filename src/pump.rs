//! Background receive loop feeding a [`ProtocolHandler`].

use log::Level;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::reader::ProtocolHandler;
use crate::transport::RfidTransport;

const READ_BUFFER_SIZE: usize = 256;

/// Owns the thread that reads from the transport and hands bytes to
/// [`ProtocolHandler::handle_received`]. The thread stops when the pump is
/// stopped or dropped.
pub struct ReceivePump {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReceivePump {
    pub fn spawn<T>(handler: Arc<ProtocolHandler<T>>) -> io::Result<Self>
    where
        T: RfidTransport + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("rfe-receive".into())
            .spawn(move || receive_loop(&handler, &flag))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("receive thread panicked");
            }
        }
    }
}

impl Drop for ReceivePump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop<T: RfidTransport>(handler: &ProtocolHandler<T>, running: &AtomicBool) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    while running.load(Ordering::SeqCst) {
        match handler.read_transport(&mut buf) {
            Ok(0) => {}
            Ok(n) => handler.handle_received(&buf[..n]),
            Err(e) => {
                handler.trace(Level::Error, format_args!("receive failed: {}", e));
                thread::sleep(handler.config().receive_poll);
            }
        }
    }
}
