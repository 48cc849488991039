// Snapper joints and their physical ranges
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::config::{
    ARM_DEGREES_MAX, ARM_DEGREES_MIN, ARM_PULSE_MAX_US, ARM_PULSE_MIN_US, CENTER_PULSE_US,
    GRIPPER_PERCENT_MAX, GRIPPER_PERCENT_MIN, GRIPPER_PULSE_MAX_US, GRIPPER_PULSE_MIN_US,
    PULSE_LENGTH_US,
};
use crate::range::{clamp, interpolate, RangeError};

/// Arm joints, numbered by their PWM channel
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Waist = 0,
    Shoulder = 1,
    Elbow = 2,
    Wrist = 3,
    Gripper = 4,
}

impl Joint {
    pub const ALL: [Joint; 5] = [
        Joint::Waist,
        Joint::Shoulder,
        Joint::Elbow,
        Joint::Wrist,
        Joint::Gripper,
    ];

    pub fn channel(self) -> u8 {
        self as u8
    }

    pub fn domain(self) -> &'static JointDomain {
        match self {
            Joint::Gripper => &GRIPPER_DOMAIN,
            _ => &ARM_DOMAIN,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Joint::Waist => "waist",
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::Wrist => "wrist",
            Joint::Gripper => "gripper",
        };
        f.write_str(name)
    }
}

/// Value range of a joint and the pulse widths it maps onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDomain {
    pub min: i32,
    pub max: i32,
    pub pulse_min_us: f64,
    pub pulse_max_us: f64,
}

/// Waist, shoulder, elbow and wrist: degrees
pub const ARM_DOMAIN: JointDomain = JointDomain {
    min: ARM_DEGREES_MIN,
    max: ARM_DEGREES_MAX,
    pulse_min_us: ARM_PULSE_MIN_US,
    pulse_max_us: ARM_PULSE_MAX_US,
};

/// Gripper: percent open, 0 is fully closed
pub const GRIPPER_DOMAIN: JointDomain = JointDomain {
    min: GRIPPER_PERCENT_MIN,
    max: GRIPPER_PERCENT_MAX,
    pulse_min_us: GRIPPER_PULSE_MIN_US,
    pulse_max_us: GRIPPER_PULSE_MAX_US,
};

impl JointDomain {
    pub fn clamp(&self, value: i32) -> Result<i32, RangeError> {
        clamp(value, self.min, self.max)
    }

    /// Pulse width in µs for a (clamped) joint value
    pub fn pulse_width_us(&self, value: i32) -> Result<f64, RangeError> {
        let value = self.clamp(value)?;
        Ok(interpolate(
            f64::from(value),
            (f64::from(self.min), f64::from(self.max)),
            (self.pulse_min_us, self.pulse_max_us),
        ))
    }

    /// PWM off-tick for a (clamped) joint value
    pub fn off_tick(&self, value: i32) -> Result<u16, RangeError> {
        Ok(pulse_to_ticks(self.pulse_width_us(value)?))
    }

    /// Joint value closest to a pulse width
    pub fn value_at_pulse(&self, pulse_us: f64) -> i32 {
        interpolate(
            pulse_us,
            (self.pulse_min_us, self.pulse_max_us),
            (f64::from(self.min), f64::from(self.max)),
        )
        .round() as i32
    }
}

/// Convert a pulse width in µs to whole PWM counter ticks (truncating)
pub fn pulse_to_ticks(pulse_us: f64) -> u16 {
    (pulse_us / PULSE_LENGTH_US) as u16
}

/// Last commanded value of every joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointPositions([i32; 5]);

impl JointPositions {
    pub fn new(waist: i32, shoulder: i32, elbow: i32, wrist: i32, gripper: i32) -> Self {
        Self([waist, shoulder, elbow, wrist, gripper])
    }

    /// Positions matching the center pulse on every channel
    pub fn centered() -> Self {
        let mut positions = Self([0; 5]);
        for joint in Joint::ALL {
            positions[joint] = joint.domain().value_at_pulse(CENTER_PULSE_US);
        }
        positions
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, i32)> + '_ {
        Joint::ALL.into_iter().map(move |joint| (joint, self[joint]))
    }
}

impl Default for JointPositions {
    fn default() -> Self {
        Self::centered()
    }
}

impl Index<Joint> for JointPositions {
    type Output = i32;

    fn index(&self, joint: Joint) -> &i32 {
        &self.0[joint as usize]
    }
}

impl IndexMut<Joint> for JointPositions {
    fn index_mut(&mut self, joint: Joint) -> &mut i32 {
        &mut self.0[joint as usize]
    }
}
