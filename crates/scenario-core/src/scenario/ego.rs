//! Ego route: the right lane of every normal road, threaded through each
//! junction along the approach and exit arms.

use crate::config::GeneratorConfig;
use crate::geometry::{distance, polyline_crossing, Point};
use crate::individual::Individual;
use crate::intersection::{Direction, Intersection};
use crate::network::interpolate;
use crate::road::RoadPiece;
use crate::scenario::speed::assign_speeds;
use crate::scenario::{
    lane_path, push_spaced, start_pose, LaneChoice, Participant, ParticipantId, Pose, Waypoint,
};
use crate::traffic_control::Action;

/// Length of an exit arm skipped before the first exit waypoint.
const EXIT_SKIP: f64 = 4.0;

pub const EGO_COLOR: &str = "White";

/// Ego lane of one piece, resampled for waypoint extraction.
pub fn ego_lane(piece: &RoadPiece, choice: LaneChoice, config: &GeneratorConfig) -> Vec<Point> {
    lane_path(
        &interpolate(piece, config).points,
        piece.lanes(),
        choice,
        config.ego_samples,
        config,
    )
}

pub fn derive(individual: &Individual, config: &GeneratorConfig) -> Participant {
    let init = individual
        .roads
        .first()
        .and_then(|road| start_pose(&ego_lane(road, LaneChoice::Right, config)))
        .unwrap_or(Pose {
            position: [0.0, 0.0],
            heading: 0.0,
        });

    let waypoints = if config.ego_waypoints {
        route(individual, config)
    } else {
        Vec::new()
    };

    Participant {
        id: ParticipantId::Ego,
        init,
        waypoints,
        color: EGO_COLOR.to_string(),
        spawn_roads: Vec::new(),
        end_roads: Vec::new(),
    }
}

fn route(individual: &Individual, config: &GeneratorConfig) -> Vec<Waypoint> {
    let mut waypoints = Vec::new();
    let mut halts = Vec::new();
    for (k, road) in individual.roads.iter().enumerate() {
        push_spaced(&mut waypoints, &ego_lane(road, LaneChoice::Right, config), k);
        if let Some(intersection) = individual.intersections.get(k) {
            waypoints.pop();
            cross(&mut waypoints, &mut halts, intersection, k, config);
        }
    }
    assign_speeds(&mut waypoints, &halts);
    waypoints
}

/// Waypoints through intersection `k`, from the end of road `k` to the
/// start of road `k + 1`.
fn cross(
    waypoints: &mut Vec<Waypoint>,
    halts: &mut Vec<usize>,
    intersection: &Intersection,
    k: usize,
    config: &GeneratorConfig,
) {
    let (Some(approach), Some(exit)) = (intersection.approach(), intersection.exit()) else {
        return;
    };
    let choice = if intersection.direction == Direction::Left {
        LaneChoice::TurnLeft
    } else {
        LaneChoice::Right
    };
    let approach_lane = ego_lane(approach, choice, config);
    let exit_lane = ego_lane(exit, LaneChoice::Right, config);
    let Some(&exit_start) = exit_lane.first() else {
        return;
    };

    let half = approach_lane.len() / 2;
    push_spaced(waypoints, &approach_lane[..half], k);
    if intersection.control.action() == Action::Stop {
        halts.push(waypoints.len());
    }

    let crossing = match intersection.direction {
        Direction::Right => polyline_crossing(&approach_lane, &exit_lane),
        _ => None,
    };
    let exit_from = match crossing {
        Some((point, _, j)) => {
            push_spaced(waypoints, &[point], k);
            j + 1
        }
        None => {
            push_spaced(waypoints, &approach_lane[half..], k);
            waypoints.pop();
            0
        }
    };

    let tail: Vec<Point> = exit_lane[exit_from.min(exit_lane.len())..]
        .iter()
        .copied()
        .filter(|&p| distance(p, exit_start) > EXIT_SKIP)
        .collect();
    push_spaced(waypoints, &tail, k + 1);
    waypoints.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Stage;
    use crate::intersection::{IntersectionProposal, Ways};
    use crate::road::{Lanes, RoadKind};
    use crate::traffic_control::{Signal, TrafficControl};

    fn lanes() -> Lanes {
        Lanes {
            left: 1,
            right: 1,
            width: 8.0,
        }
    }

    fn individual(direction: Direction, signal: Signal) -> Individual {
        let proposal = IntersectionProposal {
            last: [45.0, 0.0],
            center: [65.0, 0.0],
            straight: [75.0, 0.0],
            left: [65.0, 50.0],
            right: [65.0, -50.0],
            direction,
            ways: Ways::Four,
            opposite: lanes(),
        };
        let exit = proposal.exit_point();
        let next_end = match direction {
            Direction::Straight => [100.0, 0.0],
            Direction::Left => [65.0, 75.0],
            Direction::Right => [65.0, -75.0],
        };
        let control = TrafficControl {
            intersection_id: 0,
            signal,
        };
        Individual {
            roads: vec![
                RoadPiece::new(vec![[1.0, 0.0], [30.0, 0.0], [45.0, 0.0]], lanes(), RoadKind::Normal),
                RoadPiece::new(vec![exit, next_end], lanes(), RoadKind::Normal),
            ],
            intersections: vec![proposal.commit(lanes(), control)],
            time_of_day: 0.5,
            traffic_seed: 1,
            parked_seed: 2,
            anchors: Vec::new(),
            fitness: 0.0,
            stage: Stage::Generated,
            scenario: None,
        }
    }

    #[test]
    fn straight_route_stays_in_the_right_lane() {
        let config = GeneratorConfig::default();
        let ind = individual(Direction::Straight, Signal::PrioritySign);
        let ego = derive(&ind, &config);
        assert!((ego.init.position[1] + 2.0).abs() < 1e-6, "{:?}", ego.init);
        assert!(ego.init.heading.abs() < 1e-6);
        for w in &ego.waypoints {
            assert!((w.position[1] + 2.0).abs() < 1e-6, "{w:?}");
        }
        let roads: Vec<usize> = ego.waypoints.iter().map(|w| w.road).collect();
        assert!(roads.windows(2).all(|w| w[0] <= w[1]), "{roads:?}");
        assert_eq!(ego.waypoints.last().map(|w| w.speed), Some(0.0));
    }

    #[test]
    fn waypoints_are_spaced() {
        let config = GeneratorConfig::default();
        for direction in [Direction::Left, Direction::Straight, Direction::Right] {
            let ind = individual(direction, Signal::PrioritySign);
            let ego = derive(&ind, &config);
            for w in ego.waypoints.windows(2) {
                assert!(
                    distance(w[0].position, w[1].position) >= 1.5 - 1e-9,
                    "{direction:?}: {:?} -> {:?}",
                    w[0].position,
                    w[1].position
                );
            }
        }
    }

    #[test]
    fn right_turn_cuts_through_the_lane_crossing() {
        let config = GeneratorConfig::default();
        let ind = individual(Direction::Right, Signal::PrioritySign);
        let ego = derive(&ind, &config);
        assert!(
            ego.waypoints
                .iter()
                .any(|w| distance(w.position, [63.0, -2.0]) < 1e-6),
            "missing lane crossing"
        );
        let end = ego.waypoints.last().unwrap().position;
        assert!((end[0] - 63.0).abs() < 1e-6 && end[1] < -60.0, "{end:?}");
    }

    #[test]
    fn stop_action_halts_before_the_junction() {
        let config = GeneratorConfig::default();
        let ind = individual(Direction::Straight, Signal::StopSign);
        let ego = derive(&ind, &config);
        let stopped = ego
            .waypoints
            .iter()
            .position(|w| w.speed == 0.0)
            .expect("a halt");
        assert!(stopped + 1 < ego.waypoints.len());
        let p = ego.waypoints[stopped].position;
        assert!(p[0] < 65.0, "halt after the center: {p:?}");
    }

    #[test]
    fn disabled_waypoints_keep_the_spawn_pose() {
        let config = GeneratorConfig {
            ego_waypoints: false,
            ..GeneratorConfig::default()
        };
        let ind = individual(Direction::Left, Signal::PrioritySign);
        let ego = derive(&ind, &config);
        assert!(ego.waypoints.is_empty());
        assert_eq!(ego.init.position, [1.0, -2.0]);
    }
}
