use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::road::angle_window;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Deterministic seed for reproducible runs.
    pub seed: u64,
    /// Degree of the B-spline used to interpolate every road piece.
    pub spline_degree: usize,
    /// Consecutive rejected proposals tolerated before a growth step or a
    /// mutation gives up.
    pub max_tries: usize,
    /// Number of individuals kept between evolution cycles.
    pub population_size: usize,
    /// Number of lowest-fitness individuals preserved verbatim each cycle.
    pub number_elites: usize,
    pub min_segment_length: f64,
    pub max_segment_length: f64,
    /// Minimum number of pieces (control points plus intersections).
    pub min_nodes: usize,
    /// Maximum number of pieces (control points plus intersections).
    pub max_nodes: usize,
    /// Distance from the last point to the straight exit of an intersection.
    pub intersection_length: f64,
    /// Length of the left and right arms of an intersection.
    pub opposite_road_length: f64,
    /// Distance from the last point to the intersection center.
    pub straight_length: f64,
    pub max_left_lanes: u32,
    pub max_right_lanes: u32,
    pub min_lane_width: u32,
    pub max_lane_width: u32,
    /// Interpolation samples for normal roads.
    pub road_samples: usize,
    /// Interpolation samples for intersection arms.
    pub intersection_samples: usize,
    /// Resampling count for traffic participant paths.
    pub participant_samples: usize,
    /// Resampling count for each ego route leg.
    pub ego_samples: usize,
    /// Chance of trying an intersection before growing the next point.
    pub intersection_probability: f64,
    /// Chance that each cosmetic mutation operator fires.
    pub mutation_probability: f64,
    /// Maximum distance an obstacle may sit from its first sampled position.
    pub obstacle_position_bound: f64,
    /// Maximum rotation (degrees) an obstacle may deviate from its first
    /// sampled rotation.
    pub obstacle_rotation_bound: f64,
    /// Multiplier on half the road width when building width lines.
    pub corridor_scale: f64,
    /// Derive traffic participants besides the ego car.
    pub traffic: bool,
    /// Derive ego waypoints.
    pub ego_waypoints: bool,
    /// Derive parked cars.
    pub parked_cars: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            spline_degree: 2,
            max_tries: 20,
            population_size: 4,
            number_elites: 2,
            min_segment_length: 10.0,
            max_segment_length: 30.0,
            min_nodes: 6,
            max_nodes: 16,
            intersection_length: 30.0,
            opposite_road_length: 30.0,
            straight_length: 20.0,
            max_left_lanes: 2,
            max_right_lanes: 2,
            min_lane_width: 4,
            max_lane_width: 5,
            road_samples: 100,
            intersection_samples: 25,
            participant_samples: 45,
            ego_samples: 100,
            intersection_probability: 0.25,
            mutation_probability: 0.3,
            obstacle_position_bound: 1.5,
            obstacle_rotation_bound: 10.0,
            corridor_scale: 1.0,
            traffic: true,
            ego_waypoints: true,
            parked_cars: true,
        }
    }
}

impl GeneratorConfig {
    /// Reject settings that make the generation constraints unsatisfiable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_segment_length > 0.0 && self.min_segment_length.is_finite()) {
            return Err(ConfigError::NonPositive {
                field: "min_segment_length",
                value: self.min_segment_length,
            });
        }
        if !self.max_segment_length.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "max_segment_length",
                value: self.max_segment_length,
            });
        }
        if self.min_segment_length > self.max_segment_length {
            return Err(ConfigError::SegmentLengthInverted {
                min: self.min_segment_length,
                max: self.max_segment_length,
            });
        }
        if self.max_tries == 0 {
            return Err(ConfigError::ZeroRetryBudget);
        }
        if self.max_nodes < 4 {
            return Err(ConfigError::TooFewNodes {
                max_nodes: self.max_nodes,
            });
        }
        if self.min_nodes > self.max_nodes {
            return Err(ConfigError::NodeBoundsInverted {
                min: self.min_nodes,
                max: self.max_nodes,
            });
        }
        if self.max_left_lanes == 0 || self.max_right_lanes == 0 {
            return Err(ConfigError::NoLanes);
        }
        let lanes = self.max_left_lanes + self.max_right_lanes;
        let (min_deg, max_deg) = angle_window(lanes);
        if min_deg > max_deg {
            return Err(ConfigError::AngleWindowCollapsed { lanes });
        }
        if self.min_lane_width == 0 || self.min_lane_width > self.max_lane_width {
            return Err(ConfigError::LaneWidthInverted {
                min: self.min_lane_width,
                max: self.max_lane_width,
            });
        }
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.number_elites > self.population_size {
            return Err(ConfigError::TooManyElites {
                elites: self.number_elites,
                population: self.population_size,
            });
        }
        if self.spline_degree == 0 {
            return Err(ConfigError::ZeroSplineDegree);
        }
        for (field, samples) in [
            ("road_samples", self.road_samples),
            ("intersection_samples", self.intersection_samples),
            ("participant_samples", self.participant_samples),
            ("ego_samples", self.ego_samples),
        ] {
            if samples < 2 {
                return Err(ConfigError::TooFewSamples { field, samples });
            }
        }
        for (field, value) in [
            ("intersection_probability", self.intersection_probability),
            ("mutation_probability", self.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }
        for (field, value) in [
            ("intersection_length", self.intersection_length),
            ("opposite_road_length", self.opposite_road_length),
            ("straight_length", self.straight_length),
            ("obstacle_position_bound", self.obstacle_position_bound),
            ("obstacle_rotation_bound", self.obstacle_rotation_bound),
            ("corridor_scale", self.corridor_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}
