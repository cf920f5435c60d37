//! Delivery of unsolicited reader events.
//!
//! Callbacks run on the receive thread, in frame arrival order. A listener
//! that blocks stalls frame parsing, so [`ChannelListener`] never blocks: it
//! evicts the oldest queued event when its buffer is full.

use crate::constants::ReaderState;
use crate::inventory::TagEvent;
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Observer for reader interrupts. Every method defaults to doing nothing.
pub trait InterruptListener: Send + Sync {
    /// Heartbeat payload with the leading status byte removed
    fn heartbeat(&self, _data: &[u8]) {}

    fn cyclic_inventory(&self, _event: &TagEvent) {}

    fn state_changed(&self, _state: ReaderState) {}

    fn status_register_changed(&self, _status_register: u64) {}

    fn gpio_values_changed(&self, _gpio_values: u32) {}
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl InterruptListener for NoopListener {}

/// Owned form of an interrupt, as delivered through [`ChannelListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Heartbeat(Vec<u8>),
    CyclicInventory(TagEvent),
    StateChanged(ReaderState),
    StatusRegisterChanged(u64),
    GpioValuesChanged(u32),
}

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Forwards events into a bounded channel, dropping the oldest event when
/// the consumer falls behind.
pub struct ChannelListener {
    tx: Sender<ReaderEvent>,
    // kept to evict from the head of the queue when full
    rx: Receiver<ReaderEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end its events arrive on.
    pub fn new(capacity: usize) -> (Self, Receiver<ReaderEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let listener = Self {
            tx,
            rx: rx.clone(),
        };
        (listener, rx)
    }

    /// Another receiving end. Each event goes to exactly one receiver.
    pub fn receiver(&self) -> Receiver<ReaderEvent> {
        self.rx.clone()
    }

    fn publish(&self, event: ReaderEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.rx.try_recv().is_ok() {
                        log::debug!("event channel full, dropped oldest event");
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

impl InterruptListener for ChannelListener {
    fn heartbeat(&self, data: &[u8]) {
        self.publish(ReaderEvent::Heartbeat(data.to_vec()));
    }

    fn cyclic_inventory(&self, event: &TagEvent) {
        self.publish(ReaderEvent::CyclicInventory(event.clone()));
    }

    fn state_changed(&self, state: ReaderState) {
        self.publish(ReaderEvent::StateChanged(state));
    }

    fn status_register_changed(&self, status_register: u64) {
        self.publish(ReaderEvent::StatusRegisterChanged(status_register));
    }

    fn gpio_values_changed(&self, gpio_values: u32) {
        self.publish(ReaderEvent::GpioValuesChanged(gpio_values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_listener_delivers_in_order() {
        let (listener, rx) = ChannelListener::new(8);
        listener.heartbeat(&[0x01]);
        listener.state_changed(ReaderState::Scanning);
        listener.gpio_values_changed(0x0000_0003);

        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::Heartbeat(vec![0x01]));
        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::StateChanged(ReaderState::Scanning));
        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::GpioValuesChanged(3));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_listener_drops_oldest_when_full() {
        let (listener, rx) = ChannelListener::new(2);
        listener.status_register_changed(1);
        listener.status_register_changed(2);
        listener.status_register_changed(3);

        let received: Vec<ReaderEvent> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ReaderEvent::StatusRegisterChanged(2),
                ReaderEvent::StatusRegisterChanged(3),
            ]
        );
    }

    #[test]
    fn test_channel_listener_extra_receiver() {
        let (listener, rx) = ChannelListener::new(4);
        let other = listener.receiver();
        listener.gpio_values_changed(1);
        listener.gpio_values_changed(2);

        assert_eq!(other.try_recv().unwrap(), ReaderEvent::GpioValuesChanged(1));
        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::GpioValuesChanged(2));
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_channel_listener_without_consumer_does_not_block() {
        let (listener, rx) = ChannelListener::new(1);
        drop(rx);
        for i in 0..10 {
            listener.status_register_changed(i);
        }
    }

    #[test]
    fn test_noop_listener_accepts_everything() {
        let listener = NoopListener;
        listener.heartbeat(&[]);
        listener.cyclic_inventory(&TagEvent::default());
    }
}
