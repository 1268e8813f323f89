//! An interactive shell for wrecking a SUMO intersection scenario: drop potholes, barricades,
//! and street vendors onto lanes, then watch what the aggregate traffic metrics do.

#[macro_use]
extern crate log;

mod controller;
mod engine;
mod geometry;
mod obstruction;
mod repl;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use structopt::StructOpt;

use traci::{Connection, DisplayMode};

use crate::controller::ChaosController;

#[derive(StructOpt)]
#[structopt(name = "chaos", about = "Inject synthetic obstructions into a running SUMO scenario")]
struct Flags {
    /// The scenario configuration to launch SUMO with
    #[structopt(long, default_value = "intersection.sumocfg")]
    sumo_cfg: PathBuf,
    /// Run SUMO without its GUI
    #[structopt(long)]
    headless: bool,
}

fn main() {
    let flags = Flags::from_args();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(flags) {
        println!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run(flags: Flags) -> Result<()> {
    let mode = if flags.headless {
        DisplayMode::Headless
    } else {
        DisplayMode::Gui
    };

    let mut controller: ChaosController<Connection> = ChaosController::new();
    let result = match controller.start(&flags.sumo_cfg, mode) {
        Ok(()) => {
            // Give SUMO a moment to finish loading the scenario before prompting for commands.
            thread::sleep(Duration::from_secs(2));
            repl::run(&mut controller)
        }
        Err(err) => Err(err),
    };
    controller.stop();
    println!("Simulation ended");
    result
}
