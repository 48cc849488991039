// Message types exchanged with teleop over zenoh

use serde::{Deserialize, Serialize};

use crate::create::{DriveDirection, DriveIntent, TurnDirection, TurnRadius};

// Drive command from teleop/scripts -> runtime
// Turn fields are optional on the wire and default to straight travel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub direction: DriveDirection,
    pub speed_mm_s: i32,
    #[serde(default)]
    pub turn_direction: TurnDirection,
    #[serde(default)]
    pub turn_radius: TurnRadius,
}

impl From<&DriveCommand> for DriveIntent {
    fn from(cmd: &DriveCommand) -> Self {
        DriveIntent::new(
            cmd.direction,
            cmd.speed_mm_s,
            cmd.turn_direction,
            cmd.turn_radius,
        )
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
