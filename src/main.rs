use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snapper_create::config::RobotConfig;
use snapper_create::create::{Create, MockTransport};
use snapper_create::delay::{BlockingDelay, CancellableDelay};
use snapper_create::routines::{self, RoutineError};
use snapper_create::runtime;
use snapper_create::snapper::{FakePwm, Snapper};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Drive the Create 2 base and the Snapper arm
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Serial port the Create is connected to (e.g. /dev/ttyUSB0 or COM3)
    #[arg(short, long, conflicts_with = "config")]
    serial: Option<String>,

    /// JSON config file naming the serial port: {"port": "..."}
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use an in-memory serial connection to debug or test locally
    #[arg(short, long)]
    test: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Short scripted test drive
    Drive,
    /// Exercise every arm joint
    ArmDemo,
    /// Pick up bricks and stack them into a wall
    BuildWall,
    /// Send the base back to its charging dock
    Dock,
    /// Drive from zenoh teleop commands with a watchdog
    Teleop,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let create = Arc::new(connect(&cli)?);

    match cli.command {
        Command::Teleop => {
            let result = tokio::select! {
                result = runtime::run(&create) => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping teleop");
                    Ok(())
                }
            };
            routines::shutdown::<FakePwm, BlockingDelay>(Some(create.as_ref()), None)?;
            result
        }
        command => {
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after the current step");
                    flag.store(true, Ordering::Relaxed);
                }
            });

            let worker = create.clone();
            tokio::task::spawn_blocking(move || run_routine(command, &worker, cancel)).await??;
            Ok(())
        }
    }
}

/// Resolve the serial port from the CLI and open the connection
fn connect(cli: &Cli) -> Result<Create, BoxError> {
    if let Some(port) = &cli.serial {
        let create = Create::new(port)?;
        create.connect()?;
        return Ok(create);
    }
    if let Some(path) = &cli.config {
        let config = RobotConfig::load(path)?;
        let create = Create::new(&config.port)?;
        create.connect()?;
        return Ok(create);
    }
    if cli.test {
        info!("Using a mocked serial connection");
        let create = Create::new("mock")?;
        create.connect_with(Box::new(MockTransport::new()))?;
        return Ok(create);
    }
    Err("You must specify either the config file or the serial port to use".into())
}

fn run_routine(
    command: Command,
    create: &Create,
    cancel: Arc<AtomicBool>,
) -> Result<(), RoutineError> {
    // Drive legs wake up within one poll of Ctrl-C
    let mut delay = CancellableDelay::new(cancel.clone());

    let result = match command {
        Command::Drive => routines::basic_drive(create, &mut delay),
        Command::Dock => return routines::return_home(create),
        Command::ArmDemo | Command::BuildWall => {
            info!("No servo controller backend configured, arm frames are logged only");
            let mut arm = Snapper::new(FakePwm::new())?.with_cancel_flag(cancel.clone());
            let result = arm.initialize().map_err(RoutineError::from).and_then(|_| {
                if let Command::BuildWall = command {
                    create.set_safe_mode()?;
                    routines::build_wall(create, &mut arm, &mut delay)
                } else {
                    routines::arm_demo(&mut arm, &mut delay)
                }
            });

            // Stowing must not be cut short by an earlier interrupt
            cancel.store(false, Ordering::Relaxed);
            let cleanup = routines::shutdown(Some(create), Some(&mut arm));
            return result.and(cleanup);
        }
        // Handled on the async side
        Command::Teleop => Ok(()),
    };

    let cleanup = routines::shutdown::<FakePwm, BlockingDelay>(Some(create), None);
    result.and(cleanup)
}
