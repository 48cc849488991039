// PWM controller interface for the Snapper servos
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum PwmError {
    #[error("Invalid PWM frequency: {0} Hz")]
    InvalidFrequency(f64),

    #[error("PWM channel {0} out of range")]
    InvalidChannel(u8),

    #[error("PWM bus error: {0}")]
    Bus(String),
}

/// 16-channel, 12-bit servo controller
pub trait PwmOutput {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError>;

    /// Set the counter ticks at which `channel` turns on and off
    fn set_pulse(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), PwmError>;
}

pub const CHANNEL_COUNT: u8 = 16;

/// One `set_pulse` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmFrame {
    pub channel: u8,
    pub on_tick: u16,
    pub off_tick: u16,
}

/// Stand-in controller that logs and records every frame
///
/// Used for dry runs when no servo hardware is attached, and by tests.
#[derive(Debug, Clone, Default)]
pub struct FakePwm {
    frequency: Option<f64>,
    frames: Vec<PwmFrame>,
}

impl FakePwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    pub fn frames(&self) -> &[PwmFrame] {
        &self.frames
    }

    /// Frames sent to one channel
    pub fn channel_frames(&self, channel: u8) -> Vec<PwmFrame> {
        self.frames
            .iter()
            .filter(|frame| frame.channel == channel)
            .copied()
            .collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl PwmOutput for FakePwm {
    fn set_frequency(&mut self, hz: f64) -> Result<(), PwmError> {
        if hz.is_nan() || hz <= 0.0 {
            return Err(PwmError::InvalidFrequency(hz));
        }
        info!("PWM frequency set to {} Hz", hz);
        self.frequency = Some(hz);
        Ok(())
    }

    fn set_pulse(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), PwmError> {
        if channel >= CHANNEL_COUNT {
            return Err(PwmError::InvalidChannel(channel));
        }
        debug!("PWM channel {}: on={}, off={}", channel, on_tick, off_tick);
        self.frames.push(PwmFrame {
            channel,
            on_tick,
            off_tick,
        });
        Ok(())
    }
}
