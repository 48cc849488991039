// iRobot Create 2 mobile base
//
// Provides:
// - Open Interface opcodes and two's complement parameter encoding
// - Serial and in-memory transports
// - Connection/mode tracking driver with drive commands

mod driver;
pub mod protocol;
pub mod transport;

pub use driver::{Create, CreateError, Mode};
pub use protocol::{DriveDirection, DriveIntent, Opcode, TurnDirection, TurnRadius};
pub use transport::{MockTransport, SerialTransport, Transport, TransportError};
