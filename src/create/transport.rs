// Byte transports for the Create serial link
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::debug;

use crate::config::SERIAL_TIMEOUT;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport is closed")]
    Closed,
}

/// Outbound byte channel to the robot
pub trait Transport: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    fn is_open(&self) -> bool;
    fn close(&mut self);
}

/// Serial port transport
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baudrate)
            .timeout(SERIAL_TIMEOUT)
            .open()?;
        debug!("Opened {} at {} baud", port_name, baudrate);
        Ok(Self { port: Some(port) })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        // Dropping the handle closes the port
        self.port = None;
    }
}

#[derive(Debug, Default)]
struct MockState {
    written: Vec<Vec<u8>>,
    open: bool,
    fail_writes: bool,
}

/// In-memory transport that records every write
///
/// Clones share the same log, so a test can keep one handle and give the
/// other to the robot.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                open: true,
                ..MockState::default()
            })),
        }
    }

    /// Frames written so far, one entry per write call
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// All written bytes, concatenated
    pub fn bytes(&self) -> Vec<u8> {
        self.state.lock().written.concat()
    }

    /// Make every following write fail with an IO error
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn clear(&self) {
        self.state.lock().written.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(TransportError::Closed);
        }
        if state.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        debug!("Mock write: {:?}", bytes);
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn close(&mut self) {
        debug!("Mock transport closed");
        self.state.lock().open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_writes() {
        let mut mock = MockTransport::new();
        let log = mock.clone();
        mock.write(&[128]).unwrap();
        mock.write(&[131]).unwrap();
        assert_eq!(log.frames(), vec![vec![128], vec![131]]);
        assert_eq!(log.bytes(), vec![128, 131]);
    }

    #[test]
    fn test_mock_closed_rejects_writes() {
        let mut mock = MockTransport::new();
        mock.close();
        assert!(!mock.is_open());
        assert!(matches!(mock.write(&[128]), Err(TransportError::Closed)));
    }

    #[test]
    fn test_mock_failing_writes() {
        let mut mock = MockTransport::new();
        mock.fail_writes(true);
        assert!(matches!(mock.write(&[128]), Err(TransportError::Io(_))));
        assert!(mock.frames().is_empty());
    }
}
