use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::error::Rejection;
use crate::geometry::{distance, turn_angle, Point};

pub const MIN_DEGREES: f64 = 90.0;
pub const MAX_DEGREES: f64 = 270.0;

/// Degrees the turn window shrinks on each side per extra lane.
const DEGREES_PER_LANE: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadKind {
    Normal,
    IntersectionArm,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadPiece {
    pub points: Vec<Point>,
    pub width: f64,
    pub left_lanes: u32,
    pub right_lanes: u32,
    pub kind: RoadKind,
    /// Set while a structural mutation has touched this piece in the
    /// current cycle.
    pub mutated: bool,
}

impl RoadPiece {
    pub fn new(points: Vec<Point>, lanes: Lanes, kind: RoadKind) -> Self {
        Self {
            points,
            width: lanes.width,
            left_lanes: lanes.left,
            right_lanes: lanes.right,
            kind,
            mutated: false,
        }
    }

    pub fn lanes(&self) -> Lanes {
        Lanes {
            left: self.left_lanes,
            right: self.right_lanes,
            width: self.width,
        }
    }

    pub fn set_lanes(&mut self, lanes: Lanes) {
        self.left_lanes = lanes.left;
        self.right_lanes = lanes.right;
        self.width = lanes.width;
    }

    pub fn lane_count(&self) -> u32 {
        self.left_lanes + self.right_lanes
    }

    pub fn width_per_lane(&self) -> f64 {
        self.width / self.lane_count().max(1) as f64
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 1 && self.points.first() == self.points.last()
    }

    /// Interpolation sample count for this piece.
    pub fn samples(&self, config: &GeneratorConfig) -> usize {
        match self.kind {
            RoadKind::Normal => config.road_samples,
            RoadKind::IntersectionArm => config.intersection_samples,
        }
    }

    /// Turn-angle window allowed for this piece's lane count.
    pub fn angle_window(&self) -> (f64, f64) {
        angle_window(self.lane_count())
    }

    /// Check the segment-length and turn-angle constraints on every
    /// consecutive pair and triple of control points.
    pub fn check_shape(&self, config: &GeneratorConfig) -> Result<(), Rejection> {
        for w in self.points.windows(2) {
            check_segment_length(w[0], w[1], config)?;
        }
        let window = self.angle_window();
        for w in self.points.windows(3) {
            check_turn(w[0], w[1], w[2], window)?;
        }
        Ok(())
    }
}

/// Lane layout of a road piece.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lanes {
    pub left: u32,
    pub right: u32,
    pub width: f64,
}

impl Lanes {
    /// Random lane counts within the configured maxima and a matching width.
    pub fn sample(rng: &mut impl Rng, config: &GeneratorConfig) -> Self {
        let left = rng.random_range(1..=config.max_left_lanes);
        let right = rng.random_range(1..=config.max_right_lanes);
        Self {
            left,
            right,
            width: calc_width(rng, left, right, config),
        }
    }

    /// The same road seen from the other travel direction.
    pub fn mirrored(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            width: self.width,
        }
    }
}

/// Total road width: every lane gets the same random integer width.
pub fn calc_width(rng: &mut impl Rng, left: u32, right: u32, config: &GeneratorConfig) -> f64 {
    let lane_width = rng.random_range(config.min_lane_width..=config.max_lane_width);
    ((left + right) * lane_width) as f64
}

/// Allowed turn-angle window for a road with `lanes` lanes in total.
/// Wider roads need gentler turns.
pub fn angle_window(lanes: u32) -> (f64, f64) {
    let narrowing = lanes.saturating_sub(1) as f64 * DEGREES_PER_LANE;
    (MIN_DEGREES + narrowing, MAX_DEGREES - narrowing)
}

pub fn check_segment_length(a: Point, b: Point, config: &GeneratorConfig) -> Result<(), Rejection> {
    let len = distance(a, b);
    if (config.min_segment_length..=config.max_segment_length).contains(&len) {
        Ok(())
    } else {
        Err(Rejection::SegmentLength)
    }
}

pub fn check_turn(a: Point, b: Point, c: Point, (min, max): (f64, f64)) -> Result<(), Rejection> {
    if (min..=max).contains(&turn_angle(a, b, c)) {
        Ok(())
    } else {
        Err(Rejection::TurnAngle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn piece(points: Vec<Point>, left: u32, right: u32) -> RoadPiece {
        RoadPiece::new(
            points,
            Lanes {
                left,
                right,
                width: 8.0,
            },
            RoadKind::Normal,
        )
    }

    #[test]
    fn angle_window_narrows_with_lanes() {
        assert_eq!(angle_window(1), (90.0, 270.0));
        assert_eq!(angle_window(2), (105.0, 255.0));
        assert_eq!(angle_window(4), (135.0, 225.0));
    }

    #[test]
    fn calc_width_scales_with_lane_count() {
        let config = GeneratorConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for _ in 0..50 {
            let w = calc_width(&mut rng, 1, 1, &config);
            assert!(w == 8.0 || w == 10.0, "width {w}");
            let w = calc_width(&mut rng, 2, 2, &config);
            assert!(w == 16.0 || w == 20.0, "width {w}");
        }
    }

    #[test]
    fn straight_start_road_passes_shape_check() {
        let config = GeneratorConfig::default();
        let road = piece(vec![[1.0, 0.0], [30.0, 0.0], [45.0, 0.0]], 1, 1);
        assert_eq!(road.check_shape(&config), Ok(()));
    }

    #[test]
    fn hairpin_fails_turn_check() {
        let config = GeneratorConfig::default();
        let road = piece(vec![[0.0, 0.0], [20.0, 0.0], [5.0, 3.0]], 1, 1);
        assert_eq!(road.check_shape(&config), Err(Rejection::TurnAngle));
    }

    #[test]
    fn short_segment_fails_length_check() {
        let config = GeneratorConfig::default();
        let road = piece(vec![[0.0, 0.0], [5.0, 0.0]], 1, 1);
        assert_eq!(road.check_shape(&config), Err(Rejection::SegmentLength));
    }

    #[test]
    fn mirrored_lanes_swap_sides() {
        let lanes = Lanes {
            left: 1,
            right: 2,
            width: 15.0,
        };
        assert_eq!(
            lanes.mirrored(),
            Lanes {
                left: 2,
                right: 1,
                width: 15.0
            }
        );
    }
}
