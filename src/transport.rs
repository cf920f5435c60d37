/// Trait for RFID reader communication backends.
///
/// The protocol engine writes whole request frames and reads whatever bytes
/// have arrived; framing is done on top of this byte stream.
pub trait RfidTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Write data to the transport
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read available data, waiting at most `timeout_ms`.
    ///
    /// Returns `Ok(0)` when nothing arrived within the timeout.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Clear the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
