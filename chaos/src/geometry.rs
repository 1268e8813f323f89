//! Maps world coordinates onto the fixed four-armed intersection the scenario uses. The
//! intersection sits at the origin with 500-unit arms; each approach carries three lanes about
//! 3.25 units wide. This is a hardcoded coordinate-to-topology table, not a general geo-mapper.

use std::fmt;

use traci::LaneID;

/// One of the four directional approaches to the intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    pub fn edge(self) -> &'static str {
        match self {
            Approach::North => "north_approach",
            Approach::South => "south_approach",
            Approach::East => "east_approach",
            Approach::West => "west_approach",
        }
    }

    pub fn lane(self, index: usize) -> LaneID {
        LaneID(format!("{}_{}", self.edge(), index))
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.edge())
    }
}

/// Each road's pavement spans this far to either side of its axis.
const ROAD_HALF_WIDTH: f64 = 10.0;
/// The approaches start this far out; anything closer is the intersection box itself.
const INTERSECTION_CLEARANCE: f64 = 15.0;
const LANE_WIDTH: f64 = 3.25;

/// Resolves a world coordinate to the approach and lane it falls on. None for points inside the
/// intersection box or off both roads.
pub fn locate_lane(x: f64, y: f64) -> Option<(Approach, LaneID)> {
    if x.abs() < ROAD_HALF_WIDTH {
        // The north-south road
        if y > INTERSECTION_CLEARANCE {
            let index = if x < -LANE_WIDTH {
                0
            } else if x < 0.0 {
                1
            } else {
                2
            };
            return Some((Approach::North, Approach::North.lane(index)));
        }
        if y < -INTERSECTION_CLEARANCE {
            let index = if x > LANE_WIDTH {
                0
            } else if x > 0.0 {
                1
            } else {
                2
            };
            return Some((Approach::South, Approach::South.lane(index)));
        }
    } else if y.abs() < ROAD_HALF_WIDTH {
        // The east-west road
        if x > INTERSECTION_CLEARANCE {
            let index = if y > LANE_WIDTH {
                0
            } else if y > 0.0 {
                1
            } else {
                2
            };
            return Some((Approach::East, Approach::East.lane(index)));
        }
        if x < -INTERSECTION_CLEARANCE {
            let index = if y < -LANE_WIDTH {
                0
            } else if y < 0.0 {
                1
            } else {
                2
            };
            return Some((Approach::West, Approach::West.lane(index)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_pick_the_right_lane() {
        for (x, y, expected) in [
            (-5.0, 100.0, "north_approach_0"),
            (-2.0, 16.0, "north_approach_1"),
            (-3.25, 50.0, "north_approach_1"),
            (1.0, 100.0, "north_approach_2"),
            (0.0, 100.0, "north_approach_2"),
            (5.0, -100.0, "south_approach_0"),
            (2.0, -100.0, "south_approach_1"),
            (0.0, -200.0, "south_approach_2"),
            (100.0, 5.0, "east_approach_0"),
            (100.0, 2.0, "east_approach_1"),
            (16.0, -3.0, "east_approach_2"),
            (-100.0, -5.0, "west_approach_0"),
            (-100.0, -2.0, "west_approach_1"),
            (-16.0, 3.0, "west_approach_2"),
        ] {
            let (_, lane) = locate_lane(x, y).unwrap();
            assert_eq!(lane.0, expected, "at ({}, {})", x, y);
        }
    }

    #[test]
    fn approaches_match_their_road() {
        for (x, y, expected) in [
            (0.0, 50.0, Approach::North),
            (0.0, -50.0, Approach::South),
            (50.0, 0.0, Approach::East),
            (-50.0, 0.0, Approach::West),
        ] {
            let (approach, _) = locate_lane(x, y).unwrap();
            assert_eq!(approach, expected, "at ({}, {})", x, y);
        }
    }

    #[test]
    fn off_road_positions_dont_match() {
        for (x, y) in [
            // The intersection box
            (0.0, 0.0),
            (0.0, 12.0),
            (-5.0, -15.0),
            // Off both roads entirely
            (12.0, 12.0),
            (-20.0, 15.0),
            (500.0, 500.0),
            // Exactly on the pavement edge
            (10.0, 50.0),
        ] {
            assert_eq!(locate_lane(x, y), None, "at ({}, {})", x, y);
        }
    }
}
