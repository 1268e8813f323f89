//! The controller drives SUMO through this narrow seam, so tests can substitute an in-memory
//! engine for the real process.

use std::path::Path;

use anyhow::Result;

use traci::{Connection, DisplayMode, LaneID, VehicleClass};

/// Everything the controller needs from a running simulation: launch/shutdown, per-lane speed
/// and permission state, and per-vehicle telemetry.
pub trait Engine: Sized {
    fn launch(sumo_cfg: &Path, mode: DisplayMode) -> Result<Self>;
    fn shutdown(&mut self);

    fn lane_max_speed(&mut self, lane: &LaneID) -> Result<f64>;
    fn set_lane_max_speed(&mut self, lane: &LaneID, speed: f64) -> Result<()>;
    fn lane_allowed(&mut self, lane: &LaneID) -> Result<Vec<VehicleClass>>;
    fn set_lane_allowed(&mut self, lane: &LaneID, classes: Vec<VehicleClass>) -> Result<()>;

    fn vehicle_ids(&mut self) -> Result<Vec<String>>;
    fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64>;
    fn vehicle_waiting_time(&mut self, vehicle: &str) -> Result<f64>;
    fn vehicle_co2(&mut self, vehicle: &str) -> Result<f64>;
}

impl Engine for Connection {
    fn launch(sumo_cfg: &Path, mode: DisplayMode) -> Result<Connection> {
        Connection::launch(sumo_cfg, mode)
    }

    fn shutdown(&mut self) {
        if let Err(err) = self.close() {
            warn!("SUMO didn't shut down cleanly: {}", err);
        }
    }

    fn lane_max_speed(&mut self, lane: &LaneID) -> Result<f64> {
        Connection::lane_max_speed(self, lane)
    }

    fn set_lane_max_speed(&mut self, lane: &LaneID, speed: f64) -> Result<()> {
        Connection::set_lane_max_speed(self, lane, speed)
    }

    fn lane_allowed(&mut self, lane: &LaneID) -> Result<Vec<VehicleClass>> {
        Connection::lane_allowed(self, lane)
    }

    fn set_lane_allowed(&mut self, lane: &LaneID, classes: Vec<VehicleClass>) -> Result<()> {
        Connection::set_lane_allowed(self, lane, classes)
    }

    fn vehicle_ids(&mut self) -> Result<Vec<String>> {
        Connection::vehicle_ids(self)
    }

    fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64> {
        Connection::vehicle_speed(self, vehicle)
    }

    fn vehicle_waiting_time(&mut self, vehicle: &str) -> Result<f64> {
        Connection::vehicle_waiting_time(self, vehicle)
    }

    fn vehicle_co2(&mut self, vehicle: &str) -> Result<f64> {
        Connection::vehicle_co2(self, vehicle)
    }
}

#[cfg(test)]
pub mod testing {
    //! An in-memory stand-in for SUMO: 12 lanes matching the intersection scenario, plus
    //! whatever vehicles a test cares to invent.

    use std::collections::BTreeMap;

    use anyhow::bail;

    use super::*;
    use crate::geometry::Approach;

    pub struct FakeSumo {
        pub lanes: BTreeMap<LaneID, FakeLane>,
        pub vehicles: Vec<FakeVehicle>,
    }

    pub struct FakeLane {
        pub max_speed: f64,
        pub allowed: Vec<VehicleClass>,
    }

    pub struct FakeVehicle {
        pub id: String,
        pub speed: f64,
        pub waiting_time: f64,
        pub co2: f64,
    }

    impl FakeSumo {
        fn lane(&mut self, lane: &LaneID) -> Result<&mut FakeLane> {
            match self.lanes.get_mut(lane) {
                Some(state) => Ok(state),
                None => bail!("lane '{}' is not known", lane),
            }
        }

        fn vehicle(&self, vehicle: &str) -> Result<&FakeVehicle> {
            match self.vehicles.iter().find(|v| v.id == vehicle) {
                Some(v) => Ok(v),
                None => bail!("vehicle '{}' is not known", vehicle),
            }
        }
    }

    impl Engine for FakeSumo {
        fn launch(_: &Path, _: DisplayMode) -> Result<FakeSumo> {
            let mut lanes = BTreeMap::new();
            for approach in [Approach::North, Approach::South, Approach::East, Approach::West] {
                for index in 0..3 {
                    lanes.insert(
                        approach.lane(index),
                        FakeLane {
                            max_speed: 15.0,
                            allowed: vec![
                                VehicleClass::Passenger,
                                VehicleClass::Bus,
                                VehicleClass::Truck,
                            ],
                        },
                    );
                }
            }
            Ok(FakeSumo {
                lanes,
                vehicles: Vec::new(),
            })
        }

        fn shutdown(&mut self) {}

        fn lane_max_speed(&mut self, lane: &LaneID) -> Result<f64> {
            Ok(self.lane(lane)?.max_speed)
        }

        fn set_lane_max_speed(&mut self, lane: &LaneID, speed: f64) -> Result<()> {
            self.lane(lane)?.max_speed = speed;
            Ok(())
        }

        fn lane_allowed(&mut self, lane: &LaneID) -> Result<Vec<VehicleClass>> {
            Ok(self.lane(lane)?.allowed.clone())
        }

        fn set_lane_allowed(&mut self, lane: &LaneID, classes: Vec<VehicleClass>) -> Result<()> {
            self.lane(lane)?.allowed = classes;
            Ok(())
        }

        fn vehicle_ids(&mut self) -> Result<Vec<String>> {
            Ok(self.vehicles.iter().map(|v| v.id.clone()).collect())
        }

        fn vehicle_speed(&mut self, vehicle: &str) -> Result<f64> {
            Ok(self.vehicle(vehicle)?.speed)
        }

        fn vehicle_waiting_time(&mut self, vehicle: &str) -> Result<f64> {
            Ok(self.vehicle(vehicle)?.waiting_time)
        }

        fn vehicle_co2(&mut self, vehicle: &str) -> Result<f64> {
            Ok(self.vehicle(vehicle)?.co2)
        }
    }
}
