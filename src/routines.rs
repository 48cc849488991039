// Scripted drive and arm routines built on the base and arm drivers
use std::time::Duration;

use tracing::{info, warn};

use crate::create::{Create, CreateError, DriveDirection, TurnDirection, TurnRadius};
use crate::delay::Delay;
use crate::snapper::{ArmError, Joint, PwmOutput, Snapper};

#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    #[error("Create error: {0}")]
    Create(#[from] CreateError),

    #[error("Arm error: {0}")]
    Arm(#[from] ArmError),

    #[error("Routine interrupted")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RoutineError>;

/// Places the gripper on the floor about 10 cm in front of the Create
pub const FRONT_FLOOR_POSE: [(Joint, i32); 4] = [
    (Joint::Waist, 0),
    (Joint::Shoulder, 80),
    (Joint::Elbow, 20),
    (Joint::Wrist, 0),
];

pub const GRIPPER_CLOSED: i32 = 40;
pub const GRIPPER_OPEN: i32 = 99;

// Build-wall drive parameters
const FORWARD_SPEED: i32 = 100; // mm/s
const FORWARD_DURATION: Duration = Duration::from_secs(2);
const ITERATION_DELTA: Duration = Duration::from_millis(300);
const ROTATION_SPEED: i32 = 124; // mm/s, rotating in place
const ROTATION_DURATION: Duration = Duration::from_millis(3180);
const WALL_BRICKS: usize = 3;

/// Short test drive: straight, gentle left, gentle right, straight, tight left
///
/// Routines stop issuing commands as soon as `delay` reports an interrupt and
/// return `Cancelled`, possibly with the base still moving. Callers follow up
/// with [`shutdown`].
pub fn basic_drive(create: &Create, delay: &mut impl Delay) -> Result<()> {
    info!("Begin basic test drive routine");
    checkpoint(delay)?;
    create.set_safe_mode()?;

    let legs = [
        (100, TurnDirection::Left, TurnRadius::Straight, 1000),
        (200, TurnDirection::Left, TurnRadius::Radius(500), 2000),
        (300, TurnDirection::Right, TurnRadius::Radius(500), 1000),
        (200, TurnDirection::Straight, TurnRadius::Straight, 2000),
        (200, TurnDirection::Left, TurnRadius::Radius(0), 5000),
    ];
    for (speed, turn_direction, turn_radius, millis) in legs {
        create.drive(DriveDirection::Forward, speed, turn_direction, turn_radius)?;
        pause(delay, Duration::from_millis(millis))?;
    }

    create.stop_motion()?;
    info!("End basic test drive routine");
    Ok(())
}

/// Exercise every joint in turn, then a five-joint coordinated move
pub fn arm_demo<P: PwmOutput, D: Delay>(
    arm: &mut Snapper<P, D>,
    delay: &mut impl Delay,
) -> Result<()> {
    info!("Begin arm motion routine");
    arm.center()?;
    pause(delay, Duration::from_secs(1))?;

    let sweeps: [(Joint, [i32; 3]); 5] = [
        (Joint::Waist, [45, -45, 0]),
        (Joint::Elbow, [45, -45, 0]),
        (Joint::Gripper, [10, 90, 50]),
        (Joint::Shoulder, [45, -45, 0]),
        (Joint::Wrist, [45, -45, 0]),
    ];
    for (joint, targets) in sweeps {
        for target in targets {
            arm.set_joint(joint, target)?;
            pause(delay, Duration::from_secs(1))?;
        }
    }

    arm.set_joints([
        (Joint::Waist, 40),
        (Joint::Shoulder, 65),
        (Joint::Elbow, -20),
        (Joint::Wrist, 70),
        (Joint::Gripper, 65),
    ])?;
    info!("End arm motion routine");
    Ok(())
}

pub fn pick_up_brick<P: PwmOutput, D: Delay>(
    arm: &mut Snapper<P, D>,
    delay: &mut impl Delay,
) -> Result<()> {
    info!("Picking up brick");
    arm.set_joints(
        FRONT_FLOOR_POSE
            .into_iter()
            .chain([(Joint::Gripper, GRIPPER_OPEN)]),
    )?;
    pause(delay, Duration::from_secs(2))?;
    arm.set_gripper(GRIPPER_CLOSED)?;
    arm.stow()?;
    Ok(())
}

pub fn put_down_brick<P: PwmOutput, D: Delay>(
    arm: &mut Snapper<P, D>,
    delay: &mut impl Delay,
) -> Result<()> {
    info!("Putting down brick");
    arm.set_joints(
        FRONT_FLOOR_POSE
            .into_iter()
            .chain([(Joint::Gripper, GRIPPER_CLOSED)]),
    )?;
    pause(delay, Duration::from_secs(1))?;
    arm.set_gripper(GRIPPER_OPEN)?;
    pause(delay, Duration::from_secs(1))?;
    arm.stow()?;
    Ok(())
}

/// Shuttle bricks from the pickup spot to a growing wall
///
/// Starts directly in front of the first brick. Each trip turns in place,
/// drives out, drops the brick, turns back and returns, driving a little
/// further every leg.
pub fn build_wall<P: PwmOutput, D: Delay>(
    create: &Create,
    arm: &mut Snapper<P, D>,
    delay: &mut impl Delay,
) -> Result<()> {
    info!("Begin build wall routine");
    let mut extra = Duration::ZERO;

    for brick in 1..=WALL_BRICKS {
        info!("Brick {}/{}", brick, WALL_BRICKS);
        pick_up_brick(arm, delay)?;

        checkpoint(delay)?;
        create.drive_direct(ROTATION_SPEED, -ROTATION_SPEED)?;
        pause(delay, ROTATION_DURATION)?;

        create.drive_direct(FORWARD_SPEED, FORWARD_SPEED)?;
        pause(delay, FORWARD_DURATION + extra)?;

        create.stop_motion()?;
        put_down_brick(arm, delay)?;

        checkpoint(delay)?;
        create.drive_direct(-ROTATION_SPEED, ROTATION_SPEED)?;
        pause(delay, ROTATION_DURATION)?;

        create.drive_direct(FORWARD_SPEED, FORWARD_SPEED)?;
        extra += ITERATION_DELTA;
        pause(delay, FORWARD_DURATION + extra)?;

        create.stop_motion()?;
        extra += ITERATION_DELTA;
    }

    info!("End build wall routine");
    Ok(())
}

/// Seek the dock from Safe mode
pub fn return_home(create: &Create) -> Result<()> {
    create.start()?;
    create.set_safe_mode()?;
    create.return_to_dock()?;
    Ok(())
}

fn checkpoint(delay: &impl Delay) -> Result<()> {
    if delay.is_cancelled() {
        warn!("Routine interrupted, no further commands sent");
        return Err(RoutineError::Cancelled);
    }
    Ok(())
}

/// Wait, then bail out if the wait was interrupted
fn pause(delay: &mut impl Delay, duration: Duration) -> Result<()> {
    delay.delay(duration);
    checkpoint(delay)
}

/// Leave the hardware in a safe state: base halted and passive, arm stowed
///
/// Every step is attempted even when an earlier one fails; the first error is
/// returned.
pub fn shutdown<P: PwmOutput, D: Delay>(
    create: Option<&Create>,
    arm: Option<&mut Snapper<P, D>>,
) -> Result<()> {
    let mut first_error: Option<RoutineError> = None;

    if let Some(create) = create {
        if create.is_connected() {
            let steps = [create.stop_motion(), create.stop(), create.disconnect()];
            for step in steps {
                if let Err(e) = step {
                    warn!("Base shutdown step failed: {}", e);
                    first_error.get_or_insert(e.into());
                }
            }
        }
    }

    if let Some(arm) = arm {
        if let Err(e) = arm.stow() {
            warn!("Failed to stow arm: {}", e);
            first_error.get_or_insert(e.into());
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create::{MockTransport, Mode};
    use crate::delay::RecordedDelay;
    use crate::snapper::{FakePwm, JointPositions};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn robot() -> (Create, MockTransport) {
        let create = Create::new("/dev/mock").unwrap();
        let mock = MockTransport::new();
        create.connect_with(Box::new(mock.clone())).unwrap();
        mock.clear();
        (create, mock)
    }

    fn arm() -> Snapper<FakePwm, RecordedDelay> {
        Snapper::with_delay(FakePwm::new(), RecordedDelay::new()).unwrap()
    }

    /// Raises `flag` while sleeping through its `interrupt_at`-th delay,
    /// the way Ctrl-C lands in the middle of a drive leg
    struct InterruptingDelay {
        recorded: RecordedDelay,
        flag: Arc<AtomicBool>,
        interrupt_at: usize,
    }

    impl InterruptingDelay {
        fn new(interrupt_at: usize) -> Self {
            Self {
                recorded: RecordedDelay::new(),
                flag: Arc::new(AtomicBool::new(false)),
                interrupt_at,
            }
        }
    }

    impl Delay for InterruptingDelay {
        fn delay(&mut self, duration: Duration) {
            self.recorded.delay(duration);
            if self.recorded.calls().len() == self.interrupt_at {
                self.flag.store(true, Ordering::Relaxed);
            }
        }

        fn is_cancelled(&self) -> bool {
            self.flag.load(Ordering::Relaxed)
        }
    }

    const STOP_FRAME: [u8; 5] = [137, 0x00, 0x00, 0x80, 0x00];

    #[test]
    fn test_basic_drive() {
        let (create, mock) = robot();
        let mut delay = RecordedDelay::new();
        basic_drive(&create, &mut delay).unwrap();

        let frames = mock.frames();
        assert_eq!(frames.first(), Some(&vec![131]));
        assert_eq!(frames.len(), 7);
        assert!(frames[1..].iter().all(|f| f[0] == 137 && f.len() == 5));
        assert_eq!(frames[3], vec![137, 0x01, 0x2C, 0xFE, 0x0C]);
        assert_eq!(frames[6], vec![137, 0x00, 0x00, 0x80, 0x00]);
        assert_eq!(delay.total(), Duration::from_secs(11));
    }

    #[test]
    fn test_basic_drive_requires_connection() {
        let create = Create::new("/dev/mock").unwrap();
        let mut delay = RecordedDelay::new();
        assert!(matches!(
            basic_drive(&create, &mut delay),
            Err(RoutineError::Create(CreateError::NotConnected))
        ));
        assert!(delay.calls().is_empty());
    }

    #[test]
    fn test_basic_drive_interrupted_mid_leg() {
        let (create, mock) = robot();
        let mut delay = InterruptingDelay::new(2);

        assert!(matches!(
            basic_drive(&create, &mut delay),
            Err(RoutineError::Cancelled)
        ));
        // Safe mode plus the two legs started before the interrupt
        assert_eq!(mock.frames().len(), 3);
        assert_eq!(delay.recorded.calls().len(), 2);

        shutdown::<FakePwm, RecordedDelay>(Some(&create), None).unwrap();
        assert_eq!(
            mock.frames()[3..],
            [STOP_FRAME.to_vec(), vec![173], vec![128]]
        );
    }

    #[test]
    fn test_basic_drive_already_interrupted() {
        let (create, mock) = robot();
        let mut delay = InterruptingDelay::new(0);
        delay.flag.store(true, Ordering::Relaxed);

        assert!(matches!(
            basic_drive(&create, &mut delay),
            Err(RoutineError::Cancelled)
        ));
        assert!(mock.frames().is_empty());
        assert!(delay.recorded.calls().is_empty());
        assert_eq!(create.mode(), Mode::Passive);
    }

    #[test]
    fn test_pick_up_brick_ends_stowed() {
        let mut arm = arm();
        let mut delay = RecordedDelay::new();
        pick_up_brick(&mut arm, &mut delay).unwrap();
        assert_eq!(arm.positions(), JointPositions::new(0, -80, -65, -30, 40));
        assert_eq!(delay.calls(), &[Duration::from_secs(2)]);
    }

    #[test]
    fn test_arm_demo_final_pose() {
        let mut arm = arm();
        let mut delay = RecordedDelay::new();
        arm_demo(&mut arm, &mut delay).unwrap();
        assert_eq!(arm.positions(), JointPositions::new(40, 65, -20, 70, 65));
        assert_eq!(delay.calls().len(), 16);
    }

    #[test]
    fn test_build_wall() {
        let (create, mock) = robot();
        let mut arm = arm();
        let mut delay = RecordedDelay::new();
        build_wall(&create, &mut arm, &mut delay).unwrap();

        let frames = mock.frames();
        // Per brick: rotate, forward, stop, rotate back, forward, stop
        assert_eq!(frames.len(), 6 * WALL_BRICKS);
        assert_eq!(frames[0], vec![145, 0x00, 0x7C, 0xFF, 0x84]);
        assert_eq!(frames[2], vec![137, 0x00, 0x00, 0x80, 0x00]);
        assert_eq!(frames[3], vec![145, 0xFF, 0x84, 0x00, 0x7C]);
        assert_eq!(arm.positions(), JointPositions::new(0, -80, -65, -30, 40));
        assert!(delay.calls().contains(&Duration::from_millis(2600)));
    }

    #[test]
    fn test_build_wall_interrupted_during_rotation() {
        let (create, mock) = robot();
        let mut arm = arm();
        // First delay is the pickup, second the rotation in place
        let mut delay = InterruptingDelay::new(2);

        assert!(matches!(
            build_wall(&create, &mut arm, &mut delay),
            Err(RoutineError::Cancelled)
        ));
        assert_eq!(mock.frames(), vec![vec![145, 0x00, 0x7C, 0xFF, 0x84]]);
        assert_eq!(
            delay.recorded.calls(),
            &[Duration::from_secs(2), ROTATION_DURATION]
        );

        // Cleanup only halts and releases the base
        shutdown(Some(&create), Some(&mut arm)).unwrap();
        let frames = mock.frames();
        assert_eq!(frames[1..], [STOP_FRAME.to_vec(), vec![173], vec![128]]);
        assert_eq!(frames.iter().filter(|f| f[0] == 145).count(), 1);
        assert_eq!(arm.positions(), JointPositions::new(0, -80, -65, -30, 40));
    }

    #[test]
    fn test_arm_demo_interrupted() {
        let mut arm = arm();
        let mut delay = InterruptingDelay::new(1);
        assert!(matches!(
            arm_demo(&mut arm, &mut delay),
            Err(RoutineError::Cancelled)
        ));
        assert_eq!(arm.positions(), JointPositions::centered());
    }

    #[test]
    fn test_return_home() {
        let (create, mock) = robot();
        return_home(&create).unwrap();
        assert_eq!(mock.bytes(), vec![128, 131, 143]);
        assert_eq!(create.mode(), Mode::Passive);
    }

    #[test]
    fn test_shutdown() {
        let (create, mock) = robot();
        create.set_full_mode().unwrap();
        let mut arm = arm();

        shutdown(Some(&create), Some(&mut arm)).unwrap();
        assert_eq!(
            mock.frames(),
            vec![
                vec![132],
                vec![137, 0x00, 0x00, 0x80, 0x00],
                vec![173],
                vec![128],
            ]
        );
        assert!(!create.is_connected());
        assert_eq!(arm.positions(), JointPositions::new(0, -80, -65, -30, 40));
    }

    #[test]
    fn test_shutdown_disconnected_base() {
        let create = Create::new("/dev/mock").unwrap();
        shutdown::<FakePwm, RecordedDelay>(Some(&create), None).unwrap();
    }
}
