use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::geometry::Point;
use crate::intersection::{ArmRole, Direction, Intersection};
use crate::network::RoadNetwork;
use crate::road::RoadPiece;
use crate::scenario::Scenario;
use crate::traffic_control::Action;

/// Lifecycle of one candidate inside the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Unborn,
    Generated,
    Derived,
    Evaluated,
    Elite,
    Discarded,
}

/// Per-run identifier sources, owned by the controller and passed by `&mut`
/// into generation and mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    intersection: u32,
    manual_light: u32,
}

impl IdCounters {
    pub fn next_intersection(&mut self) -> u32 {
        let id = self.intersection;
        self.intersection += 1;
        id
    }

    pub fn next_manual_light(&mut self) -> String {
        let id = self.manual_light;
        self.manual_light += 1;
        format!("traffic_light_manual_{id}")
    }
}

/// First-ever placement of a perturbed obstacle and its current override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleAnchor {
    pub intersection_id: u32,
    pub approach: ArmRole,
    pub init_position: Point,
    pub init_rotation: f64,
    pub position: Point,
    pub rotation: f64,
}

/// One test-case candidate.
///
/// `roads` are the normal roads the ego car drives, chained through
/// `intersections`: intersection `k` terminates road `k` and road `k + 1`
/// starts at the end of its exit arm. Everything under `scenario` is derived
/// from the canonical fields and rebuilt after every structural change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub roads: Vec<RoadPiece>,
    pub intersections: Vec<Intersection>,
    pub time_of_day: f64,
    pub traffic_seed: u64,
    pub parked_seed: u64,
    pub anchors: Vec<ObstacleAnchor>,
    /// Lower is better. Zero until an evaluation arrives.
    pub fitness: f64,
    pub stage: Stage,
    pub scenario: Option<Scenario>,
}

impl Individual {
    pub fn network(&self) -> RoadNetwork<'_> {
        RoadNetwork::new(&self.roads, &self.intersections)
    }

    /// Roads the ego car traverses, in order.
    pub fn ego_roads(&self) -> Vec<usize> {
        (0..self.roads.len()).collect()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.intersections.iter().map(|i| i.direction).collect()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.intersections.iter().map(|i| i.control.action()).collect()
    }

    /// Control points plus intersections.
    pub fn piece_count(&self) -> usize {
        self.control_point_count() + self.intersections.len()
    }

    pub fn control_point_count(&self) -> usize {
        self.roads.iter().map(|r| r.points.len()).sum()
    }

    pub fn anchor(&self, intersection_id: u32, approach: ArmRole) -> Option<&ObstacleAnchor> {
        self.anchors
            .iter()
            .find(|a| a.intersection_id == intersection_id && a.approach == approach)
    }

    /// Structural invariants every accepted individual satisfies.
    pub fn check_invariants(&self, config: &GeneratorConfig) -> Result<(), GenerationError> {
        if self.intersections.is_empty() {
            return Err(GenerationError::InvariantViolation(
                "no intersection".to_string(),
            ));
        }
        if self.intersections.len() + 1 != self.roads.len() {
            return Err(GenerationError::InvariantViolation(format!(
                "{} intersections for {} roads",
                self.intersections.len(),
                self.roads.len()
            )));
        }
        if self.piece_count() < config.min_nodes {
            return Err(GenerationError::InvariantViolation(format!(
                "{} pieces, need at least {}",
                self.piece_count(),
                config.min_nodes
            )));
        }
        if self.roads.iter().any(|r| r.points.len() < 2) {
            return Err(GenerationError::InvariantViolation(
                "road with a single control point".to_string(),
            ));
        }
        Ok(())
    }

    /// Rebuild every derived entity from the canonical road graph.
    pub fn derive(&mut self, config: &GeneratorConfig) {
        self.scenario = Some(Scenario::derive(self, config));
        if matches!(self.stage, Stage::Unborn | Stage::Generated) {
            self.stage = Stage::Derived;
        }
    }

    /// Drop derived data after a structural change.
    pub fn invalidate(&mut self) {
        self.scenario = None;
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self.stage, Stage::Evaluated | Stage::Elite)
    }
}
