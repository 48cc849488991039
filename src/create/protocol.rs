// iRobot Create 2 Open Interface encoding
//
// Every command is a one-byte opcode followed by its data bytes. Signed
// 16-bit parameters go out as two's complement, high byte first.

use serde::{Deserialize, Serialize};

use crate::config::{MAX_SPEED_MM_S, MAX_TURN_RADIUS_MM};
use crate::range::{clamp, RangeError};

/// Open Interface opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Reset = 7,
    Start = 128,
    Baud = 129,
    Safe = 131,
    Full = 132,
    Drive = 137,
    SeekDock = 143,
    DriveDirect = 145,
    Stop = 173,
}

/// Radius word the Create interprets as "drive straight"
pub const STRAIGHT_RADIUS: i16 = i16::MIN; // 0x8000

/// Encode a signed 16-bit value as (high, low) two's complement bytes
pub fn encode(value: i16) -> (u8, u8) {
    let encoded = if value >= 0 {
        value as u32
    } else {
        (65536 + i32::from(value)) as u32
    };
    (((encoded >> 8) & 0xFF) as u8, (encoded & 0xFF) as u8)
}

/// Decode (high, low) two's complement bytes
pub fn decode(high: u8, low: u8) -> i16 {
    let encoded = (u16::from(high) << 8) | u16::from(low);
    if encoded < 0x8000 {
        encoded as i16
    } else {
        (i32::from(encoded) - 65536) as i16
    }
}

/// Build a command frame: opcode followed by its data bytes
pub fn frame(opcode: Opcode, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + data.len());
    frame.push(opcode as u8);
    frame.extend_from_slice(data);
    frame
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveDirection {
    Forward,
    Reverse,
    Standstill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
    #[default]
    Straight,
}

/// Turn radius in millimeters, or straight-line travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRadius {
    #[default]
    Straight,
    Radius(i32),
}

/// A single drive request for the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveIntent {
    pub direction: DriveDirection,
    pub speed_mm_s: i32,
    pub turn_direction: TurnDirection,
    pub turn_radius: TurnRadius,
}

impl DriveIntent {
    pub fn new(
        direction: DriveDirection,
        speed_mm_s: i32,
        turn_direction: TurnDirection,
        turn_radius: TurnRadius,
    ) -> Self {
        Self {
            direction,
            speed_mm_s,
            turn_direction,
            turn_radius,
        }
    }

    pub fn straight(direction: DriveDirection, speed_mm_s: i32) -> Self {
        Self::new(direction, speed_mm_s, TurnDirection::Straight, TurnRadius::Straight)
    }

    pub fn standstill() -> Self {
        Self::straight(DriveDirection::Standstill, 0)
    }

    /// Signed velocity word: clamped to [0, 500] first, then signed by direction
    pub fn velocity(&self) -> Result<i16, RangeError> {
        let speed = clamp(self.speed_mm_s, 0, MAX_SPEED_MM_S)?;
        let signed = match self.direction {
            DriveDirection::Forward => speed,
            DriveDirection::Reverse => -speed,
            DriveDirection::Standstill => 0,
        };
        Ok(signed as i16)
    }

    /// Signed radius word: clamped to [0, 2000] unless straight, negated for right turns
    pub fn radius(&self) -> Result<i16, RangeError> {
        let radius = match (self.turn_direction, self.turn_radius) {
            (TurnDirection::Straight, _) | (_, TurnRadius::Straight) => return Ok(STRAIGHT_RADIUS),
            (_, TurnRadius::Radius(mm)) => clamp(mm, 0, MAX_TURN_RADIUS_MM)?,
        };
        let signed = match self.turn_direction {
            TurnDirection::Right => -radius,
            _ => radius,
        };
        Ok(signed as i16)
    }

    /// Drive frame: [137, velocity hi, velocity lo, radius hi, radius lo]
    pub fn to_frame(&self) -> Result<Vec<u8>, RangeError> {
        let (velocity_hi, velocity_lo) = encode(self.velocity()?);
        let (radius_hi, radius_lo) = encode(self.radius()?);
        Ok(frame(
            Opcode::Drive,
            &[velocity_hi, velocity_lo, radius_hi, radius_lo],
        ))
    }
}

/// Drive Direct frame: [145, right hi, right lo, left hi, left lo]
///
/// Each wheel is clamped to [-500, 500] mm/s.
pub fn drive_direct_frame(right_mm_s: i32, left_mm_s: i32) -> Result<Vec<u8>, RangeError> {
    let right = clamp(right_mm_s, -MAX_SPEED_MM_S, MAX_SPEED_MM_S)? as i16;
    let left = clamp(left_mm_s, -MAX_SPEED_MM_S, MAX_SPEED_MM_S)? as i16;
    let (right_hi, right_lo) = encode(right);
    let (left_hi, left_lo) = encode(left);
    Ok(frame(
        Opcode::DriveDirect,
        &[right_hi, right_lo, left_hi, left_lo],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(0), (0x00, 0x00));
        assert_eq!(encode(-1), (0xFF, 0xFF));
        assert_eq!(encode(500), (0x01, 0xF4));
        assert_eq!(encode(-500), (0xFE, 0x0C));
        assert_eq!(encode(STRAIGHT_RADIUS), (0x80, 0x00));
    }

    #[test]
    fn test_decode_reverses_encode() {
        for value in i16::MIN..=i16::MAX {
            let (high, low) = encode(value);
            assert_eq!(decode(high, low), value, "value {}", value);
        }
    }

    #[test]
    fn test_speed_clamped_before_sign() {
        let intent = DriveIntent::new(
            DriveDirection::Forward,
            600,
            TurnDirection::Left,
            TurnRadius::Radius(500),
        );
        assert_eq!(intent.velocity(), Ok(500));

        let intent = DriveIntent::new(
            DriveDirection::Reverse,
            600,
            TurnDirection::Left,
            TurnRadius::Radius(500),
        );
        assert_eq!(intent.velocity(), Ok(-500));

        // Negative speeds clamp to zero rather than flipping direction
        let intent = DriveIntent::straight(DriveDirection::Forward, -200);
        assert_eq!(intent.velocity(), Ok(0));
    }

    #[test]
    fn test_reverse_negates_speed() {
        let intent = DriveIntent::new(
            DriveDirection::Reverse,
            300,
            TurnDirection::Left,
            TurnRadius::Radius(500),
        );
        assert_eq!(intent.velocity(), Ok(-300));
        assert_eq!(intent.radius(), Ok(500));
    }

    #[test]
    fn test_right_negates_radius() {
        let intent = DriveIntent::new(
            DriveDirection::Forward,
            200,
            TurnDirection::Right,
            TurnRadius::Radius(500),
        );
        assert_eq!(intent.radius(), Ok(-500));
        assert_eq!(
            intent.to_frame().unwrap(),
            vec![137, 0x00, 0xC8, 0xFE, 0x0C]
        );
    }

    #[test]
    fn test_radius_clamped() {
        let intent = DriveIntent::new(
            DriveDirection::Forward,
            100,
            TurnDirection::Left,
            TurnRadius::Radius(5000),
        );
        assert_eq!(intent.radius(), Ok(2000));

        let intent = DriveIntent::new(
            DriveDirection::Forward,
            100,
            TurnDirection::Right,
            TurnRadius::Radius(-40),
        );
        assert_eq!(intent.radius(), Ok(0));
    }

    #[test]
    fn test_straight_bypasses_clamp() {
        let intent = DriveIntent::new(
            DriveDirection::Forward,
            100,
            TurnDirection::Right,
            TurnRadius::Straight,
        );
        assert_eq!(intent.radius(), Ok(STRAIGHT_RADIUS));

        // A straight turn direction ignores any numeric radius
        let intent = DriveIntent::new(
            DriveDirection::Forward,
            100,
            TurnDirection::Straight,
            TurnRadius::Radius(500),
        );
        assert_eq!(intent.radius(), Ok(STRAIGHT_RADIUS));
    }

    #[test]
    fn test_standstill_frame() {
        assert_eq!(
            DriveIntent::standstill().to_frame().unwrap(),
            vec![137, 0x00, 0x00, 0x80, 0x00]
        );
    }

    #[test]
    fn test_drive_direct_frame() {
        assert_eq!(
            drive_direct_frame(124, -124).unwrap(),
            vec![145, 0x00, 0x7C, 0xFF, 0x84]
        );
        assert_eq!(
            drive_direct_frame(900, -900).unwrap(),
            vec![145, 0x01, 0xF4, 0xFE, 0x0C]
        );
    }

    #[test]
    fn test_intent_json() {
        let intent: DriveIntent = serde_json::from_str(
            r#"{"direction":"reverse","speed_mm_s":150,"turn_direction":"left","turn_radius":{"radius":300}}"#,
        )
        .unwrap();
        assert_eq!(
            intent,
            DriveIntent::new(
                DriveDirection::Reverse,
                150,
                TurnDirection::Left,
                TurnRadius::Radius(300)
            )
        );
    }
}
