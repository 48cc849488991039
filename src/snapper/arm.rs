// Snapper 5-DOF arm motion sequencing
//
// Every move is ramped one integer step at a time with a short delay between
// steps, which keeps the servos from slamming to the target and drawing
// current spikes. Multi-joint moves resample each joint's path to the same
// number of steps so all joints arrive together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::joint::{pulse_to_ticks, Joint, JointPositions};
use super::pwm::{PwmError, PwmOutput};
use crate::config::{CENTER_PULSE_US, PWM_FREQUENCY_HZ, SETTLE_DELAY, STEP_DELAY};
use crate::delay::{BlockingDelay, Delay};
use crate::range::RangeError;

#[derive(Debug, thiserror::Error)]
pub enum ArmError {
    #[error("PWM error: {0}")]
    Pwm(#[from] PwmError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] RangeError),

    #[error("Motion cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ArmError>;

/// Compact pose suitable for unpowered transport
pub const STOW_POSE: [(Joint, i32); 5] = [
    (Joint::Waist, 0),
    (Joint::Shoulder, -80),
    (Joint::Elbow, -65),
    (Joint::Wrist, -30),
    (Joint::Gripper, 40),
];

/// Driver for the Snapper arm
pub struct Snapper<P: PwmOutput, D: Delay = BlockingDelay> {
    pwm: P,
    delay: D,
    positions: JointPositions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<P: PwmOutput> Snapper<P, BlockingDelay> {
    pub fn new(pwm: P) -> Result<Self> {
        Self::with_delay(pwm, BlockingDelay)
    }
}

impl<P: PwmOutput, D: Delay> Snapper<P, D> {
    /// Create the arm interface and configure the PWM frequency
    pub fn with_delay(mut pwm: P, delay: D) -> Result<Self> {
        info!("Creating Snapper interface ({} Hz)", PWM_FREQUENCY_HZ);
        pwm.set_frequency(PWM_FREQUENCY_HZ)?;
        Ok(Self {
            pwm,
            delay,
            positions: JointPositions::centered(),
            cancel: None,
        })
    }

    /// Abort multi-step moves between steps once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn positions(&self) -> JointPositions {
        self.positions
    }

    pub fn position(&self, joint: Joint) -> i32 {
        self.positions[joint]
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Center every servo and give them time to get there
    pub fn initialize(&mut self) -> Result<()> {
        self.center()?;
        self.delay.delay(SETTLE_DELAY);
        Ok(())
    }

    /// Jump every servo to the center pulse width
    pub fn center(&mut self) -> Result<()> {
        let ticks = pulse_to_ticks(CENTER_PULSE_US);
        for joint in Joint::ALL {
            self.pwm.set_pulse(joint.channel(), 0, ticks)?;
        }
        self.positions = JointPositions::centered();
        debug!("Centered all joints at {} ticks", ticks);
        Ok(())
    }

    /// Move to the compact stowed pose
    pub fn stow(&mut self) -> Result<()> {
        info!("Stowing arm");
        self.set_joints(STOW_POSE)
    }

    pub fn set_waist(&mut self, degrees: i32) -> Result<()> {
        self.set_joint(Joint::Waist, degrees)
    }

    pub fn set_shoulder(&mut self, degrees: i32) -> Result<()> {
        self.set_joint(Joint::Shoulder, degrees)
    }

    pub fn set_elbow(&mut self, degrees: i32) -> Result<()> {
        self.set_joint(Joint::Elbow, degrees)
    }

    pub fn set_wrist(&mut self, degrees: i32) -> Result<()> {
        self.set_joint(Joint::Wrist, degrees)
    }

    /// Open the gripper to `percentage` (0 = closed, 100 = fully open)
    pub fn set_gripper(&mut self, percentage: i32) -> Result<()> {
        self.set_joint(Joint::Gripper, percentage)
    }

    /// Ramp a single joint to `target`, one integer step per delay
    ///
    /// Targets outside the joint's range are clamped to it first.
    pub fn set_joint(&mut self, joint: Joint, target: i32) -> Result<()> {
        let target = joint.domain().clamp(target)?;
        let start = self.positions[joint];
        let steps = start.abs_diff(target);
        if steps == 0 {
            return Ok(());
        }

        info!("Moving {} from {} to {}", joint, start, target);
        for value in ramp(start, target, steps) {
            self.check_cancelled()?;
            self.issue(joint, value)?;
            self.delay.delay(STEP_DELAY);
        }
        Ok(())
    }

    /// Move several joints so that they all arrive at the same time
    ///
    /// Joints left out of `targets` hold their current position.
    pub fn set_joints<I>(&mut self, targets: I) -> Result<()>
    where
        I: IntoIterator<Item = (Joint, i32)>,
    {
        let start = self.positions;
        let mut end = start;
        for (joint, target) in targets {
            end[joint] = joint.domain().clamp(target)?;
        }

        let max_steps = Joint::ALL
            .into_iter()
            .map(|joint| start[joint].abs_diff(end[joint]))
            .max()
            .unwrap_or(0);
        if max_steps == 0 {
            return Ok(());
        }

        info!("Moving joints from {:?} to {:?} in {} steps", start, end, max_steps);
        let paths = Joint::ALL.map(|joint| ramp(start[joint], end[joint], max_steps));

        for step in 0..max_steps as usize {
            self.check_cancelled()?;
            for (joint, path) in Joint::ALL.into_iter().zip(&paths) {
                self.issue(joint, path[step])?;
            }
            self.delay.delay(STEP_DELAY);
        }
        Ok(())
    }

    /// Time a move of `joint` to `target` takes, plus one step of margin
    pub fn move_duration(&self, joint: Joint, target: i32) -> Result<Duration> {
        let target = joint.domain().clamp(target)?;
        let steps = self.positions[joint].abs_diff(target);
        Ok(STEP_DELAY * steps + STEP_DELAY)
    }

    fn issue(&mut self, joint: Joint, value: i32) -> Result<()> {
        let ticks = joint.domain().off_tick(value)?;
        self.pwm.set_pulse(joint.channel(), 0, ticks)?;
        self.positions[joint] = value;
        trace!("{} -> {} ({} ticks)", joint, value, ticks);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ArmError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// `steps` evenly spaced integer points from just after `start` up to `end`
///
/// Points are computed over the ascending endpoints so truncation always
/// rounds toward the lower end, and reversed for decreasing moves. The last
/// point is always `end`.
fn ramp(start: i32, end: i32, steps: u32) -> Vec<i32> {
    if steps == 0 {
        return Vec::new();
    }
    let (low, high) = (i64::from(start.min(end)), i64::from(start.max(end)));
    let n = i64::from(steps);
    let point = |i: i64| (low + (high - low) * i / n) as i32;

    if end >= start {
        (1..=n).map(point).collect()
    } else {
        (0..n).rev().map(point).collect()
    }
}
