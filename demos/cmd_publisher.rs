// Keyboard teleop: W/S drive, A/D turn, R/F speed, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use snapper_create::config::TOPIC_CMD_DRIVE;
use snapper_create::create::{DriveDirection, TurnDirection, TurnRadius};
use snapper_create::messages::DriveCommand;
use std::time::{Duration, Instant};
use tracing::info;

const SPEEDS: [i32; 3] = [100, 250, 500]; // mm/s
const TURN_RADIUS_MM: i32 = 500;
const INPUT_TIMEOUT_MS: u64 = 100; // Stop after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: W/S=forward/reverse, A/D=turn, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent drive state
    let mut direction = DriveDirection::Standstill;
    let mut turn_direction = TurnDirection::Straight;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        direction = DriveDirection::Forward;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        direction = DriveDirection::Reverse;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        turn_direction = TurnDirection::Left;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        turn_direction = TurnDirection::Right;
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Stop if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            direction = DriveDirection::Standstill;
            turn_direction = TurnDirection::Straight;
        }

        let turn_radius = match turn_direction {
            TurnDirection::Straight => TurnRadius::Straight,
            _ => TurnRadius::Radius(TURN_RADIUS_MM),
        };
        // Turning without a direction key drives forward along the arc
        let direction = match (direction, turn_direction) {
            (DriveDirection::Standstill, TurnDirection::Left | TurnDirection::Right) => {
                DriveDirection::Forward
            }
            (direction, _) => direction,
        };

        // Always publish at ~50Hz
        let cmd = DriveCommand {
            direction,
            speed_mm_s: SPEEDS[speed_idx],
            turn_direction,
            turn_radius,
        };
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
