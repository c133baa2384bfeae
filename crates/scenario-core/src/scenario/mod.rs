//! Scenario assembly: everything derived from the canonical road graph.
//!
//! Assembly is a pure function of an [`Individual`]; randomness comes only
//! from RNGs seeded with the individual's own seeds, so deriving twice yields
//! identical participants, obstacles and triggers.

pub mod ego;
pub mod obstacles;
pub mod parked;
pub mod speed;
pub mod traffic;

use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::geometry::{add, distance, heading, offset_polyline, Point};
use crate::individual::Individual;
use crate::intersection::Direction;
use crate::road::Lanes;
use crate::spline::b_spline;
use crate::traffic_control::{Action, LightColor};

pub use obstacles::{Obstacle, ObstacleKind};
pub use parked::ParkedCar;

/// Waypoints closer than this to their predecessor are dropped.
pub const MIN_WAYPOINT_SPACING: f64 = 1.5;
pub const WAYPOINT_TOLERANCE: f64 = 2.0;
pub const TRIGGER_TOLERANCE: f64 = 2.0;
/// Seconds the ego car halts on a stop trigger.
pub const STOP_DURATION: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParticipantId {
    Ego,
    /// Cross traffic spawned at intersections where the ego car stops.
    CrossTraffic,
    /// Oncoming traffic driving every normal road in reverse.
    Oncoming,
}

impl ParticipantId {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantId::Ego => "ego",
            ParticipantId::CrossTraffic => "other_0",
            ParticipantId::Oncoming => "other_1",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    /// Degrees counter-clockwise from +x.
    pub heading: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Point,
    pub tolerance: f64,
    /// Normal road the waypoint belongs to.
    pub road: usize,
    pub speed: f64,
}

impl Waypoint {
    pub fn new(position: Point, road: usize) -> Self {
        Self {
            position,
            tolerance: WAYPOINT_TOLERANCE,
            road,
            speed: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub init: Pose,
    pub waypoints: Vec<Waypoint>,
    pub color: String,
    /// Roads where a conditionally spawned participant appears.
    pub spawn_roads: Vec<usize>,
    /// Roads where its paths end.
    pub end_roads: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TriggerAction {
    SpawnAndStart {
        participant: ParticipantId,
        spawn: Pose,
    },
    SwitchLights {
        object_id: String,
        initial: LightColor,
        switch_to: LightColor,
    },
    Stop {
        duration: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub position: Point,
    pub tolerance: f64,
    pub triggered_by: ParticipantId,
    pub action: TriggerAction,
}

impl Trigger {
    pub fn by_ego(position: Point, action: TriggerAction) -> Self {
        Self {
            position,
            tolerance: TRIGGER_TOLERANCE,
            triggered_by: ParticipantId::Ego,
            action,
        }
    }
}

/// Derived part of an individual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub ego_roads: Vec<usize>,
    pub directions: Vec<Direction>,
    pub actions: Vec<Action>,
    pub participants: Vec<Participant>,
    pub obstacles: Vec<Obstacle>,
    pub triggers: Vec<Trigger>,
    pub parked_cars: Vec<ParkedCar>,
    /// Goal of the ego car: the end of the last road.
    pub success_point: Option<Point>,
}

impl Scenario {
    pub fn derive(individual: &Individual, config: &GeneratorConfig) -> Self {
        let (obstacles, mut triggers) = obstacles::derive(individual, config);
        let mut participants = vec![ego::derive(individual, config)];
        if config.traffic {
            let (others, spawn_triggers) = traffic::derive(individual, config);
            participants.extend(others);
            triggers.extend(spawn_triggers);
        }
        let parked_cars = if config.parked_cars {
            parked::derive(individual, config)
        } else {
            Vec::new()
        };
        Self {
            ego_roads: individual.ego_roads(),
            directions: individual.directions(),
            actions: individual.actions(),
            participants,
            obstacles,
            triggers,
            parked_cars,
            success_point: individual.roads.last().and_then(|r| r.last()),
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn ego(&self) -> Option<&Participant> {
        self.participant(ParticipantId::Ego)
    }
}

/// Which lane of a road a path follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneChoice {
    /// Rightmost lane in travel direction.
    Right,
    /// Leftmost lane of the travel direction, used before left turns on
    /// roads with more than one lane per direction.
    TurnLeft,
}

/// Signed lateral offset (positive = left) of the chosen lane's center.
pub fn lane_offset(lanes: Lanes, choice: LaneChoice) -> f64 {
    let total = (lanes.left + lanes.right).max(1);
    let per_lane = lanes.width / total as f64;
    match choice {
        LaneChoice::TurnLeft if lanes.right > 1 => {
            (lanes.right as f64 - lanes.left as f64 - 1.0) * per_lane / 2.0
        }
        _ => -((total - 1) as f64) * per_lane / 2.0,
    }
}

/// Centerline of a lane, resampled on a B-spline to `samples` points.
pub fn lane_path(
    centerline: &[Point],
    lanes: Lanes,
    choice: LaneChoice,
    samples: usize,
    config: &GeneratorConfig,
) -> Vec<Point> {
    let offset = offset_polyline(centerline, lane_offset(lanes, choice));
    if offset.len() < 2 {
        return offset;
    }
    b_spline(&offset, samples, config.spline_degree)
}

/// Append `points` as waypoints, dropping any closer than the minimum
/// spacing to the last kept one.
pub fn push_spaced(waypoints: &mut Vec<Waypoint>, points: &[Point], road: usize) {
    for &p in points {
        let keep = waypoints
            .last()
            .is_none_or(|w| distance(w.position, p) >= MIN_WAYPOINT_SPACING);
        if keep {
            waypoints.push(Waypoint::new(p, road));
        }
    }
}

/// Pose at the start of a path, heading along its first segment.
pub fn start_pose(path: &[Point]) -> Option<Pose> {
    let first = *path.first()?;
    let next = path
        .iter()
        .copied()
        .find(|&p| distance(p, first) > f64::EPSILON)
        .unwrap_or(add(first, [1.0, 0.0]));
    Some(Pose {
        position: first,
        heading: heading(first, next),
    })
}
