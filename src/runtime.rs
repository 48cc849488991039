// 50 Hz teleop loop with watchdog
// Note: if teleop crashes or the link drops, commands stop arriving and the
// watchdog brings the base to a standstill instead of letting it keep driving

use std::time::{Duration, Instant};
use tokio::task::block_in_place;
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_DRIVE, TOPIC_HEALTH};
use crate::create::{Create, CreateError, DriveIntent};
use crate::messages::{DriveCommand, RuntimeHealth};

pub struct Runtime {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
    last_sent: Option<DriveIntent>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            last_sent: None,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand, now: Instant) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// Compute the drive intent based on watchdog state
    pub fn compute_intent(&mut self, now: Instant) -> DriveIntent {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        if cmd_age > CMD_TIMEOUT {
            // Watchdog triggered - stop the robot
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping robot", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            DriveIntent::standstill()
        } else if let Some(ref cmd) = self.latest_cmd {
            self.health = RuntimeHealth::Ok;
            DriveIntent::from(cmd)
        } else {
            // No command ever received
            self.health = RuntimeHealth::CmdStale;
            DriveIntent::standstill()
        }
    }

    /// The intent to send this tick, if it differs from the last one sent
    pub fn next_frame(&mut self, now: Instant) -> Option<DriveIntent> {
        let intent = self.compute_intent(now);
        if self.last_sent == Some(intent) {
            return None;
        }
        self.last_sent = Some(intent);
        Some(intent)
    }
}

/// Send this tick's intent to the base if it changed
///
/// Serial writes block for up to the port timeout, so they run through
/// `block_in_place` to keep the other tasks on the runtime moving. Needs the
/// multi-threaded runtime.
pub fn send_intent(
    create: &Create,
    runtime: &mut Runtime,
    now: Instant,
) -> Result<Option<DriveIntent>, CreateError> {
    let Some(intent) = runtime.next_frame(now) else {
        return Ok(None);
    };
    block_in_place(|| create.drive_intent(&intent))?;
    Ok(Some(intent))
}

/// Drive the base from zenoh teleop commands until an error occurs
pub async fn run(create: &Create) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    block_in_place(|| create.set_safe_mode())?;

    let mut runtime = Runtime::new();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}", TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd, Instant::now());
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Compute intent (includes watchdog logic), send only on change
        send_intent(create, &mut runtime, Instant::now())?;

        // 3. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}
