//! Scrollworld entry point
//!
//! Runs a headless autopilot session and prints the final tally. Exit status
//! is success even when setup fails; the failure is logged instead.

use std::path::PathBuf;

use clap::Parser;

use scrollworld::SetupError;
use scrollworld::runtime::{AutoPilot, RunSummary, SimulationClock};
use scrollworld::settings::SimConfig;

#[derive(Parser, Debug)]
#[command(name = "scrollworld")]
#[command(about = "Headless endless side-scroller simulation")]
struct Args {
    /// JSON settings file (defaults are used when absent or unreadable)
    settings: Option<PathBuf>,

    /// Frames the autopilot plays before quitting
    #[arg(long, default_value_t = 3600)]
    frames: u64,
}

fn run(args: Args) -> Result<RunSummary, SetupError> {
    let config = SimConfig::load_or_default(args.settings.as_deref());
    let clock = SimulationClock::start(config, AutoPilot::new(args.frames))?;
    Ok(clock.run())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    log::info!("Scrollworld starting...");

    match run(args) {
        Ok(summary) => {
            println!("Game over ({:?})", summary.reason);
            println!("Score: {}", summary.score);
            println!("Coins: {}", summary.coins);
            println!(
                "Lives left: {} | frames: {} | time: {:.1}s",
                summary.lives,
                summary.frames,
                summary.elapsed.as_secs_f32()
            );
        }
        Err(e) => log::error!("Setup failed: {e}"),
    }
}
