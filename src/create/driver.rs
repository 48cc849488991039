// High-level driver for the iRobot Create 2 base
//
// Tracks the connection and Open Interface mode, and turns drive intents into
// protocol frames. Transport and mode share one lock so a write can never
// interleave with connect or disconnect.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::protocol::{
    drive_direct_frame, frame, DriveDirection, DriveIntent, Opcode, TurnDirection, TurnRadius,
};
use super::transport::{SerialTransport, Transport, TransportError};
use crate::config::BAUDRATE;
use crate::range::RangeError;

/// Open Interface modes as last commanded by this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Off,
    Passive,
    Safe,
    Full,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Not connected: call connect before sending commands to the Create")]
    NotConnected,

    #[error("A serial port identifier is required")]
    MissingPort,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] RangeError),
}

pub type Result<T> = std::result::Result<T, CreateError>;

struct Link {
    transport: Option<Box<dyn Transport>>,
    mode: Mode,
}

/// Host-side driver for the Create 2
pub struct Create {
    port: String,
    link: Mutex<Link>,
}

impl Create {
    /// Create a driver for the given serial port; nothing is opened yet
    pub fn new(port: &str) -> Result<Self> {
        if port.trim().is_empty() {
            return Err(CreateError::MissingPort);
        }
        Ok(Self {
            port: port.to_string(),
            link: Mutex::new(Link {
                transport: None,
                mode: Mode::Off,
            }),
        })
    }

    /// Open the serial port and start the Open Interface (Passive mode)
    pub fn connect(&self) -> Result<()> {
        info!("Opening Create serial link on {} at {} baud", self.port, BAUDRATE);
        let transport = SerialTransport::open(&self.port, BAUDRATE)?;
        self.connect_with(Box::new(transport))
    }

    /// Start the Open Interface over an already opened transport
    pub fn connect_with(&self, transport: Box<dyn Transport>) -> Result<()> {
        let mut link = self.link.lock();
        if let Some(mut previous) = link.transport.take() {
            warn!("Replacing existing connection to {}", self.port);
            previous.close();
        }
        link.transport = Some(transport);
        Self::send_locked(&mut link, &frame(Opcode::Start, &[]))?;
        link.mode = Mode::Passive;
        info!("Connected to Create on {} (passive mode)", self.port);
        Ok(())
    }

    /// Return the robot to Passive mode, then close the transport
    ///
    /// Leaving the Create in Safe or Full mode keeps it from sleeping or
    /// charging, so Passive is always sent first and `mode()` reports Passive
    /// afterwards. A no-op when not connected.
    pub fn disconnect(&self) -> Result<()> {
        let mut link = self.link.lock();
        if link.transport.is_none() {
            return Ok(());
        }
        if !Self::is_open(&link) {
            warn!("Serial link to {} already closed", self.port);
            link.transport = None;
            link.mode = Mode::Off;
            return Ok(());
        }

        info!("Disconnecting from Create on {}", self.port);
        Self::send_locked(&mut link, &frame(Opcode::Start, &[]))?;
        if let Some(mut transport) = link.transport.take() {
            transport.close();
        }
        link.mode = Mode::Passive;
        Ok(())
    }

    /// True while a transport is attached and still open
    pub fn is_connected(&self) -> bool {
        Self::is_open(&self.link.lock())
    }

    pub fn mode(&self) -> Mode {
        self.link.lock().mode
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    // === Mode commands ===

    /// Start the Open Interface; required again after stop or reset
    pub fn start(&self) -> Result<()> {
        self.send_mode(Opcode::Start, Mode::Passive)
    }

    pub fn set_safe_mode(&self) -> Result<()> {
        self.send_mode(Opcode::Safe, Mode::Safe)
    }

    pub fn set_full_mode(&self) -> Result<()> {
        self.send_mode(Opcode::Full, Mode::Full)
    }

    /// Stop the Open Interface; the Create ignores commands until `start`
    pub fn stop(&self) -> Result<()> {
        self.send_mode(Opcode::Stop, Mode::Off)
    }

    /// Soft reset, as if the battery had been removed and reinserted
    pub fn reset(&self) -> Result<()> {
        self.send_mode(Opcode::Reset, Mode::Off)
    }

    /// Seek the home base and charge; the Create drops to Passive
    pub fn return_to_dock(&self) -> Result<()> {
        self.send_mode(Opcode::SeekDock, Mode::Passive)
    }

    // === Motion ===

    /// Drive with the given direction, speed (mm/s) and turn radius (mm)
    pub fn drive(
        &self,
        direction: DriveDirection,
        speed_mm_s: i32,
        turn_direction: TurnDirection,
        turn_radius: TurnRadius,
    ) -> Result<()> {
        self.drive_intent(&DriveIntent::new(
            direction,
            speed_mm_s,
            turn_direction,
            turn_radius,
        ))
    }

    pub fn drive_intent(&self, intent: &DriveIntent) -> Result<()> {
        let mut link = self.link.lock();
        Self::ensure_connected(&link)?;
        let frame = intent.to_frame()?;
        debug!("Drive {:?}: {:02X?}", intent, frame);
        Self::send_locked(&mut link, &frame)
    }

    pub fn drive_straight_forward(&self, speed_mm_s: i32) -> Result<()> {
        self.drive_intent(&DriveIntent::straight(DriveDirection::Forward, speed_mm_s))
    }

    pub fn drive_straight_reverse(&self, speed_mm_s: i32) -> Result<()> {
        self.drive_intent(&DriveIntent::straight(DriveDirection::Reverse, speed_mm_s))
    }

    pub fn stop_motion(&self) -> Result<()> {
        self.drive_intent(&DriveIntent::standstill())
    }

    /// Control each wheel independently, speeds in mm/s clamped to [-500, 500]
    pub fn drive_direct(&self, right_mm_s: i32, left_mm_s: i32) -> Result<()> {
        let mut link = self.link.lock();
        Self::ensure_connected(&link)?;
        let frame = drive_direct_frame(right_mm_s, left_mm_s)?;
        debug!(
            "Drive direct right={} left={}: {:02X?}",
            right_mm_s, left_mm_s, frame
        );
        Self::send_locked(&mut link, &frame)
    }

    // === Internals ===

    fn send_mode(&self, opcode: Opcode, mode: Mode) -> Result<()> {
        let mut link = self.link.lock();
        Self::ensure_connected(&link)?;
        Self::send_locked(&mut link, &frame(opcode, &[]))?;
        debug!("Mode {:?} -> {:?} via {:?}", link.mode, mode, opcode);
        link.mode = mode;
        Ok(())
    }

    fn is_open(link: &Link) -> bool {
        link.transport.as_ref().is_some_and(|transport| transport.is_open())
    }

    fn ensure_connected(link: &Link) -> Result<()> {
        if !Self::is_open(link) {
            return Err(CreateError::NotConnected);
        }
        Ok(())
    }

    /// Write one frame; a failed write drops the connection
    fn send_locked(link: &mut Link, bytes: &[u8]) -> Result<()> {
        let transport = link.transport.as_mut().ok_or(CreateError::NotConnected)?;
        if let Err(e) = transport.write(bytes) {
            warn!("Lost connection to the Create: {}", e);
            if let Some(mut transport) = link.transport.take() {
                transport.close();
            }
            link.mode = Mode::Off;
            return Err(e.into());
        }
        Ok(())
    }
}

impl Drop for Create {
    fn drop(&mut self) {
        // Never leave the robot in Safe/Full mode
        if let Err(e) = self.disconnect() {
            warn!("Failed to disconnect Create on drop: {}", e);
        }
    }
}
