// Snapper 5-DOF servo arm
//
// Provides:
// - Joint ranges and angle -> pulse width interpolation
// - PWM controller interface (plus a recording stand-in)
// - Ramped single-joint and synchronized multi-joint moves

mod arm;
pub mod joint;
pub mod pwm;

pub use arm::{ArmError, Snapper, STOW_POSE};
pub use joint::{Joint, JointDomain, JointPositions};
pub use pwm::{FakePwm, PwmError, PwmOutput};
