// Protocol constants, PWM timing, runtime topics and the JSON port config
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

// Create 2 serial link
pub const BAUDRATE: u32 = 115_200;
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

// Drive limits (mm/s and mm)
pub const MAX_SPEED_MM_S: i32 = 500;
pub const MAX_TURN_RADIUS_MM: i32 = 2000;

// Snapper PWM controller (12-bit counter)
pub const PWM_FREQUENCY_HZ: f64 = 50.0;
pub const PWM_RESOLUTION: f64 = 4096.0;
/// Duration of one PWM counter tick in microseconds
pub const PULSE_LENGTH_US: f64 = 1_000_000.0 / PWM_FREQUENCY_HZ / PWM_RESOLUTION;

// Pulse widths (µs)
pub const ARM_PULSE_MIN_US: f64 = 600.0; // fully counter-clockwise
pub const ARM_PULSE_MAX_US: f64 = 2400.0; // fully clockwise
pub const GRIPPER_PULSE_MIN_US: f64 = 750.0; // never go below this, the gripper servo binds
pub const GRIPPER_PULSE_MAX_US: f64 = 2400.0;
pub const CENTER_PULSE_US: f64 = 1500.0;

// Joint domains
pub const ARM_DEGREES_MIN: i32 = -90;
pub const ARM_DEGREES_MAX: i32 = 90;
pub const GRIPPER_PERCENT_MIN: i32 = 0;
pub const GRIPPER_PERCENT_MAX: i32 = 100;

/// Delay between consecutive servo steps
pub const STEP_DELAY: Duration = Duration::from_millis(7);
/// Time given to the servos to reach center after initialization
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);
/// How often long routine delays check for an interrupt
pub const CANCEL_POLL: Duration = Duration::from_millis(50);

// Teleop runtime
pub const LOOP_HZ: u64 = 50;
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "snapper/cmd/drive"; // commands
pub const TOPIC_HEALTH: &str = "snapper/state/health"; // health status

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config does not name a serial port")]
    MissingPort,
}

/// JSON config file, e.g. `{"port": "/dev/ttyUSB0"}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RobotConfig {
    pub port: String,
}

impl RobotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: RobotConfig = serde_json::from_str(text)?;
        if config.port.trim().is_empty() {
            return Err(ConfigError::MissingPort);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_length() {
        assert_eq!(PULSE_LENGTH_US, 4.8828125);
    }

    #[test]
    fn test_config_from_json() {
        let config = RobotConfig::from_json(r#"{"port": "/dev/ttyUSB0"}"#).unwrap();
        assert_eq!(config.port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_config_rejects_empty_port() {
        let err = RobotConfig::from_json(r#"{"port": "  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPort));
    }

    #[test]
    fn test_config_rejects_missing_field() {
        let err = RobotConfig::from_json(r#"{"serial": "COM3"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = RobotConfig::load(Path::new("/nonexistent/snapper.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
