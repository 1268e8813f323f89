//! The interactive shell: whitespace-tokenized commands, one per line. Bad input prints a
//! complaint and the loop keeps going; only `quit` or end-of-input stops it.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};

use crate::controller::ChaosController;
use crate::engine::Engine;
use crate::obstruction::ObstructionKind;

const DEFAULT_LENGTH: f64 = 20.0;

/// One parsed command line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Add {
        kind: ObstructionKind,
        x: f64,
        y: f64,
        length: f64,
    },
    Remove {
        id: String,
    },
    Clear,
    List,
    Metrics,
    Quit,
}

impl Command {
    /// Parses one line. Blank lines parse to None. Extra trailing tokens are ignored, matching
    /// how lenient the shell has always been.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let first = match tokens.first() {
            Some(first) => *first,
            None => return Ok(None),
        };

        match first {
            "add" => {
                if tokens.len() < 4 {
                    bail!("Usage: add <type> <x> <y> [length]");
                }
                let kind = ObstructionKind::parse(tokens[1]);
                let x = tokens[2].parse::<f64>()?;
                let y = tokens[3].parse::<f64>()?;
                let length = if tokens.len() > 4 {
                    tokens[4].parse::<f64>()?
                } else {
                    DEFAULT_LENGTH
                };
                Ok(Some(Command::Add { kind, x, y, length }))
            }
            "remove" => {
                if tokens.len() < 2 {
                    bail!("Usage: remove <id>");
                }
                Ok(Some(Command::Remove {
                    id: tokens[1].to_string(),
                }))
            }
            "clear" => Ok(Some(Command::Clear)),
            "list" => Ok(Some(Command::List)),
            "metrics" => Ok(Some(Command::Metrics)),
            "quit" => Ok(Some(Command::Quit)),
            _ => bail!("Invalid command. Type 'quit' to exit."),
        }
    }
}

/// Runs the shell until `quit` or EOF. Individual command failures print and continue.
pub fn run<E: Engine>(controller: &mut ChaosController<E>) -> Result<()> {
    print_banner();
    let stdin = io::stdin();

    loop {
        print!("\nChaos> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(err) = execute(controller, command) {
            println!("Error: {}", err);
        }
    }
    Ok(())
}

fn execute<E: Engine>(controller: &mut ChaosController<E>, command: Command) -> Result<()> {
    match command {
        Command::Add { kind, x, y, length } => {
            let id = controller.add_obstruction(kind.clone(), x, y, length)?;
            println!("Added {} with ID: {}", kind, id);
        }
        Command::Remove { id } => {
            controller.remove_obstruction(&id)?;
        }
        Command::Clear => {
            controller.clear_all();
        }
        Command::List => {
            let mut empty = true;
            for obstruction in controller.obstructions() {
                println!("{}", obstruction);
                empty = false;
            }
            if empty {
                println!("No active obstructions");
            }
        }
        Command::Metrics => {
            let metrics = controller.metrics()?;
            println!("Metrics: {}", serde_json::to_string_pretty(&metrics)?);
        }
        // Handled by the caller
        Command::Quit => {}
    }
    Ok(())
}

fn print_banner() {
    println!();
    println!("=== SUMO Traffic Simulator Chaos Controller ===");
    println!("Commands:");
    println!("  add <type> <x> <y> [length] - Add obstruction (pothole/barricade/vendor)");
    println!("  remove <id>                 - Remove obstruction by ID");
    println!("  clear                       - Clear all obstructions");
    println!("  list                        - List active obstructions");
    println!("  metrics                     - Show current metrics");
    println!("  quit                        - Exit");
    println!();
    println!("Example: add pothole -50 100 25");
    println!("         add barricade 0 -200");
}
