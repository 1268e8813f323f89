//! Owns the registry of active obstructions and keeps it in sync with the engine: every
//! registered obstruction corresponds to exactly one mutation of lane state, and removing it
//! issues the documented inverse.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;

use traci::{DisplayMode, VehicleClass};

use crate::engine::Engine;
use crate::geometry;
use crate::obstruction::{Obstruction, ObstructionKind};

/// Every lane in the scenario starts at this speed. Removal restores it no matter what the lane
/// was actually set to before the obstruction landed, so stacked obstructions on one lane don't
/// unwind cleanly.
pub const DEFAULT_LANE_SPEED: f64 = 15.0;

/// What a lane allows once a barricade is lifted.
fn default_allowed() -> Vec<VehicleClass> {
    vec![
        VehicleClass::Passenger,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ]
}

/// Aggregate telemetry over every vehicle currently simulated. active_vehicles always equals
/// total_vehicles; nothing distinguishes them yet.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub average_speed: f64,
    pub average_wait_time: f64,
    pub co2_emissions: f64,
}

/// The one stateful object in the program. Running means the engine handle exists; stopping
/// drops it.
pub struct ChaosController<E: Engine> {
    engine: Option<E>,
    obstructions: BTreeMap<String, Obstruction>,
    // Monotonic, never reset by removals, so ids stay unique for the life of the controller
    next_id: usize,
}

impl<E: Engine> ChaosController<E> {
    pub fn new() -> ChaosController<E> {
        ChaosController {
            engine: None,
            obstructions: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Launches the engine. Failures are returned once; nothing retries.
    pub fn start(&mut self, sumo_cfg: &Path, mode: DisplayMode) -> Result<()> {
        if self.engine.is_some() {
            bail!("SUMO is already running");
        }
        self.engine = Some(E::launch(sumo_cfg, mode)?);
        println!("SUMO simulation started");
        Ok(())
    }

    /// Shuts the engine down. Calling this when nothing is running is a no-op.
    pub fn stop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.shutdown();
            println!("SUMO simulation stopped");
        }
    }

    pub fn running(&self) -> bool {
        self.engine.is_some()
    }

    /// Places an obstruction at a world coordinate, applies its effect to the resolved lane, and
    /// returns the new id.
    pub fn add_obstruction(
        &mut self,
        kind: ObstructionKind,
        x: f64,
        y: f64,
        length: f64,
    ) -> Result<String> {
        if self.engine.is_none() {
            bail!("SUMO not running");
        }
        let (approach, lane) = match geometry::locate_lane(x, y) {
            Some(hit) => hit,
            None => bail!("Position ({}, {}) is not on a valid road lane", x, y),
        };

        let id = format!("{}_{}", kind, self.next_id);
        self.next_id += 1;
        let effects = kind.effects();

        let engine = self.running_engine()?;
        match &kind {
            ObstructionKind::Pothole => {
                let current = engine.lane_max_speed(&lane)?;
                let new_speed = current * (1.0 - effects.speed_reduction);
                engine.set_lane_max_speed(&lane, new_speed)?;
                println!("Pothole placed on {}: Speed reduced to {:.1} m/s", lane, new_speed);
            }
            ObstructionKind::Barricade => {
                engine.set_lane_allowed(&lane, Vec::new())?;
                println!("Barricade placed on {}: Lane blocked", lane);
            }
            ObstructionKind::Vendor => {
                let current = engine.lane_max_speed(&lane)?;
                let new_speed = current * (1.0 - effects.speed_reduction);
                engine.set_lane_max_speed(&lane, new_speed)?;
                println!(
                    "Vendor zone placed on {}: Speed reduced to {:.1} m/s",
                    lane, new_speed
                );
            }
            // An unrecognized kind sits in the registry without touching the lane
            ObstructionKind::Other(_) => {}
        }

        self.obstructions.insert(
            id.clone(),
            Obstruction {
                id: id.clone(),
                kind,
                approach,
                lane,
                position: (x, y),
                length,
                effects,
                active: true,
            },
        );
        Ok(id)
    }

    /// Reverts the obstruction's effect and drops it from the registry. The lane goes back to
    /// the fixed defaults, not to a snapshot of its prior state.
    pub fn remove_obstruction(&mut self, id: &str) -> Result<()> {
        let obstruction = match self.obstructions.get(id) {
            Some(obstruction) => obstruction,
            None => bail!("Obstruction {} not found", id),
        };
        let kind = obstruction.kind.clone();
        let lane = obstruction.lane.clone();

        match kind {
            ObstructionKind::Pothole | ObstructionKind::Vendor => {
                self.running_engine()?
                    .set_lane_max_speed(&lane, DEFAULT_LANE_SPEED)?;
            }
            ObstructionKind::Barricade => {
                self.running_engine()?
                    .set_lane_allowed(&lane, default_allowed())?;
            }
            ObstructionKind::Other(_) => {}
        }

        self.obstructions.remove(id);
        println!("Removed obstruction {} from {}", id, lane);
        Ok(())
    }

    /// Removes everything, attempting each obstruction even if an earlier one fails.
    pub fn clear_all(&mut self) {
        let ids: Vec<String> = self.obstructions.keys().cloned().collect();
        for id in ids {
            if let Err(err) = self.remove_obstruction(&id) {
                warn!("Leaving {} in place: {}", id, err);
            }
        }
        println!("All obstructions cleared");
    }

    pub fn obstructions(&self) -> impl Iterator<Item = &Obstruction> {
        self.obstructions.values()
    }

    /// Averages per-vehicle telemetry across the simulation. All zeroes when the engine isn't
    /// running or no vehicles are active.
    pub fn metrics(&mut self) -> Result<Metrics> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Ok(Metrics::default()),
        };
        let vehicles = engine.vehicle_ids()?;
        if vehicles.is_empty() {
            return Ok(Metrics::default());
        }

        let mut total_speed = 0.0;
        let mut total_wait = 0.0;
        let mut total_co2 = 0.0;
        for vehicle in &vehicles {
            total_speed += engine.vehicle_speed(vehicle)?;
            total_wait += engine.vehicle_waiting_time(vehicle)?;
            total_co2 += engine.vehicle_co2(vehicle)?;
        }

        let count = vehicles.len();
        Ok(Metrics {
            total_vehicles: count,
            active_vehicles: count,
            average_speed: total_speed / (count as f64),
            average_wait_time: total_wait / (count as f64),
            // Convert to kg
            co2_emissions: total_co2 / 1000.0,
        })
    }

    fn running_engine(&mut self) -> Result<&mut E> {
        match self.engine.as_mut() {
            Some(engine) => Ok(engine),
            None => bail!("SUMO not running"),
        }
    }

    #[cfg(test)]
    pub fn engine(&mut self) -> &mut E {
        self.engine.as_mut().unwrap()
    }
}
