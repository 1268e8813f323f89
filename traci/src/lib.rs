//! This crate provides a Rust interface to the
//! [TraCI](https://sumo.dlr.de/docs/TraCI.html) remote control protocol of the
//! [SUMO](https://www.eclipse.org/sumo/) traffic simulator: launching the simulation process,
//! framing messages over its socket, and typed access to the handful of lane and vehicle
//! variables the obstruction controller needs. It deliberately covers only that narrow slice of
//! the protocol.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::fmt;

pub use self::connection::{Connection, DisplayMode};

mod connection;
mod protocol;

/// A lane is identified by its SUMO id, like "north_approach_2".
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LaneID(pub String);

impl fmt::Display for LaneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SUMO's abstract vehicle classes, or at least the ones lane permissions round-trip through
/// here.
#[derive(Clone, Debug, PartialEq)]
pub enum VehicleClass {
    Passenger,
    Bus,
    Truck,
    // TODO Cover the rest of
    // https://sumo.dlr.de/docs/Definition_of_Vehicles,_Vehicle_Types,_and_Routes.html#abstract_vehicle_class
    Other(String),
}

impl VehicleClass {
    /// Every token parses; SUMO is the authority on which classes actually exist.
    pub fn parse(token: &str) -> VehicleClass {
        match token {
            "passenger" => VehicleClass::Passenger,
            "bus" => VehicleClass::Bus,
            "truck" => VehicleClass::Truck,
            _ => VehicleClass::Other(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VehicleClass::Passenger => "passenger",
            VehicleClass::Bus => "bus",
            VehicleClass::Truck => "truck",
            VehicleClass::Other(token) => token,
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_class_round_trips() {
        for token in ["passenger", "bus", "truck", "rail_urban"] {
            assert_eq!(VehicleClass::parse(token).as_str(), token);
        }
        assert_eq!(
            VehicleClass::parse("tram"),
            VehicleClass::Other("tram".to_string())
        );
    }
}
