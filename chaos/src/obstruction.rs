//! Obstruction kinds and the fixed effect each one has on its lane.

use std::fmt;

use traci::LaneID;

use crate::geometry::Approach;

/// The kinds of synthetic hazard the shell can place. Tokens it doesn't recognize still parse,
/// carrying an empty effect record; they occupy the registry without touching the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ObstructionKind {
    Pothole,
    Barricade,
    Vendor,
    Other(String),
}

impl ObstructionKind {
    pub fn parse(token: &str) -> ObstructionKind {
        match token {
            "pothole" => ObstructionKind::Pothole,
            "barricade" => ObstructionKind::Barricade,
            "vendor" => ObstructionKind::Vendor,
            _ => ObstructionKind::Other(token.to_string()),
        }
    }

    pub fn effects(&self) -> Effects {
        match self {
            ObstructionKind::Pothole => Effects {
                speed_reduction: 0.5,
                capacity_reduction: 0.0,
                blocked: false,
            },
            ObstructionKind::Barricade => Effects {
                speed_reduction: 0.0,
                capacity_reduction: 0.0,
                blocked: true,
            },
            ObstructionKind::Vendor => Effects {
                speed_reduction: 0.3,
                capacity_reduction: 0.5,
                blocked: false,
            },
            ObstructionKind::Other(_) => Effects {
                speed_reduction: 0.0,
                capacity_reduction: 0.0,
                blocked: false,
            },
        }
    }
}

impl fmt::Display for ObstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObstructionKind::Pothole => write!(f, "pothole"),
            ObstructionKind::Barricade => write!(f, "barricade"),
            ObstructionKind::Vendor => write!(f, "vendor"),
            ObstructionKind::Other(token) => write!(f, "{}", token),
        }
    }
}

/// How an obstruction degrades its lane. capacity_reduction is recorded for reporting only;
/// nothing maps it onto the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effects {
    pub speed_reduction: f64,
    pub capacity_reduction: f64,
    pub blocked: bool,
}

/// One placed hazard. Lives in the controller's registry from `add` until `remove` or `clear`;
/// never persisted anywhere.
#[derive(Clone, Debug)]
pub struct Obstruction {
    pub id: String,
    pub kind: ObstructionKind,
    pub approach: Approach,
    pub lane: LaneID,
    /// The original world coordinate, as typed
    pub position: (f64, f64),
    /// Nominal length; stored, but not checked against the simulated geometry
    pub length: f64,
    pub effects: Effects,
    /// Always true while registered; removal deletes the entry instead of flipping this
    pub active: bool,
}

impl fmt::Display for Obstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} on {} at ({}, {})",
            self.id, self.kind, self.lane, self.position.0, self.position.1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for token in ["pothole", "barricade", "vendor", "cone"] {
            assert_eq!(ObstructionKind::parse(token).to_string(), token);
        }
    }

    #[test]
    fn unknown_kinds_have_no_effect() {
        let effects = ObstructionKind::parse("cone").effects();
        assert_eq!(effects.speed_reduction, 0.0);
        assert_eq!(effects.capacity_reduction, 0.0);
        assert!(!effects.blocked);
    }
}
