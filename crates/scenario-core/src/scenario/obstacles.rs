//! Signs and traffic lights placed at every junction, plus the ego-side
//! triggers they imply.

use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::geometry::{add, normalize, rotate, scale, sub, turn_angle, Point};
use crate::individual::Individual;
use crate::intersection::{ArmRole, Direction, Intersection};
use crate::scenario::ego::ego_lane;
use crate::scenario::{LaneChoice, Trigger, TriggerAction, STOP_DURATION};
use crate::traffic_control::{LightColor, LightMode, PoleSign, Signal};

/// Gap between the road edge and an obstacle.
const SIDE_OFFSET: f64 = 0.2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    StopSign,
    PrioritySign,
    SingleTrafficLight { mode: LightMode, pole: PoleSign },
    DoubleTrafficLight { mode: LightMode, pole: PoleSign },
}

impl ObstacleKind {
    fn light(single: bool, mode: LightMode, pole: PoleSign) -> Self {
        if single {
            ObstacleKind::SingleTrafficLight { mode, pole }
        } else {
            ObstacleKind::DoubleTrafficLight { mode, pole }
        }
    }

    pub fn mode(&self) -> Option<&LightMode> {
        match self {
            ObstacleKind::SingleTrafficLight { mode, .. }
            | ObstacleKind::DoubleTrafficLight { mode, .. } => Some(mode),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Point,
    /// Degrees around the vertical axis.
    pub rotation: f64,
    pub intersection_id: u32,
    /// Arm whose incoming traffic the obstacle controls.
    pub approach: ArmRole,
    pub facing_ego: bool,
    /// First-ever placement, set once a mutation has moved the obstacle.
    pub init_position: Option<Point>,
    pub init_rotation: Option<f64>,
}

/// Obstacles of every junction and the triggers they put on the ego route.
pub fn derive(individual: &Individual, config: &GeneratorConfig) -> (Vec<Obstacle>, Vec<Trigger>) {
    let mut obstacles = Vec::new();
    let mut triggers = Vec::new();
    for (k, intersection) in individual.intersections.iter().enumerate() {
        for role in [ArmRole::Approach, ArmRole::Left, ArmRole::Straight, ArmRole::Right] {
            if let Some(mut obstacle) = place(intersection, role) {
                if let Some(anchor) = individual.anchor(obstacle.intersection_id, role) {
                    obstacle.position = anchor.position;
                    obstacle.rotation = anchor.rotation;
                    obstacle.init_position = Some(anchor.init_position);
                    obstacle.init_rotation = Some(anchor.init_rotation);
                }
                obstacles.push(obstacle);
            }
        }
        if let Some(position) = trigger_point(individual, k, config) {
            triggers.extend(ego_triggers(intersection, position, config));
        }
    }
    (obstacles, triggers)
}

/// Where the ego car enters the approach arm of intersection `k`.
fn trigger_point(individual: &Individual, k: usize, config: &GeneratorConfig) -> Option<Point> {
    let intersection = individual.intersections.get(k)?;
    let choice = if intersection.direction == Direction::Left {
        LaneChoice::TurnLeft
    } else {
        LaneChoice::Right
    };
    ego_lane(intersection.approach()?, choice, config).first().copied()
}

fn ego_triggers(intersection: &Intersection, position: Point, config: &GeneratorConfig) -> Vec<Trigger> {
    let stop = || {
        Trigger::by_ego(
            position,
            TriggerAction::Stop {
                duration: STOP_DURATION,
            },
        )
    };
    match &intersection.control.signal {
        Signal::StopSign => vec![stop()],
        Signal::PrioritySign => Vec::new(),
        Signal::Light {
            mode: LightMode::Manual { object_id, initial },
            ..
        } => {
            let mut triggers = vec![Trigger::by_ego(
                position,
                TriggerAction::SwitchLights {
                    object_id: object_id.clone(),
                    initial: *initial,
                    switch_to: initial.toggled(),
                },
            )];
            if *initial == LightColor::Green && config.ego_waypoints {
                triggers.push(stop());
            }
            triggers
        }
        Signal::Light {
            pole: PoleSign::Yield,
            ..
        } => vec![stop()],
        Signal::Light { .. } => Vec::new(),
    }
}

/// What stands on the arm with `role`, derived from the junction's control.
fn kind_for(intersection: &Intersection, role: ArmRole) -> Option<ObstacleKind> {
    let arm = intersection.arm(role)?;
    let kind = match (&intersection.control.signal, role) {
        (Signal::StopSign, ArmRole::Approach | ArmRole::Straight) => ObstacleKind::StopSign,
        (Signal::StopSign, _) => ObstacleKind::PrioritySign,
        (Signal::PrioritySign, ArmRole::Approach | ArmRole::Straight) => ObstacleKind::PrioritySign,
        (Signal::PrioritySign, _) => ObstacleKind::StopSign,
        (Signal::Light { mode, pole }, ArmRole::Approach) => {
            ObstacleKind::light(arm.right_lanes == 1, mode.clone(), *pole)
        }
        (Signal::Light { mode, pole }, ArmRole::Straight) => {
            ObstacleKind::light(arm.left_lanes == 1, mode.for_opposite(), *pole)
        }
        (Signal::Light { mode, pole }, _) => {
            ObstacleKind::light(arm.left_lanes == 1, mode.for_opposite(), pole.flipped())
        }
    };
    Some(kind)
}

fn place(intersection: &Intersection, role: ArmRole) -> Option<Obstacle> {
    let kind = kind_for(intersection, role)?;
    let approach = intersection.approach()?;
    let arm = intersection.arm(role)?;
    let center = intersection.center;
    let end = intersection.corner(role);
    let right_ref = intersection.corner(match role {
        ArmRole::Approach => ArmRole::Right,
        ArmRole::Left => ArmRole::Approach,
        ArmRole::Straight => ArmRole::Left,
        ArmRole::Right => ArmRole::Straight,
    });
    let (along, side) = match role {
        ArmRole::Approach | ArmRole::Straight => {
            (intersection.opposite.width / 2.0, approach.width / 2.0 + SIDE_OFFSET)
        }
        ArmRole::Left | ArmRole::Right => (approach.width / 2.0, arm.width / 2.0 + SIDE_OFFSET),
    };

    let angle = turn_angle(right_ref, center, end).round();
    let setback = if angle <= 270.0 {
        0.1
    } else {
        ((angle - 270.0) / 10.0 + 0.2) * 1.3
    };
    let u = normalize(sub(end, center))?;
    let base = add(center, scale(u, along + setback));
    let position = add(base, scale(rotate(scale(u, -1.0), -90.0), side));
    let rotation = turn_angle(add(center, [5.0, 0.0]), center, end).round() + 180.0;

    Some(Obstacle {
        kind,
        position,
        rotation,
        intersection_id: intersection.control.intersection_id,
        approach: role,
        facing_ego: role == ArmRole::Approach,
        init_position: None,
        init_rotation: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;
    use crate::individual::{ObstacleAnchor, Stage};
    use crate::intersection::{IntersectionProposal, Ways};
    use crate::road::{Lanes, RoadKind, RoadPiece};
    use crate::traffic_control::TrafficControl;

    fn lanes(left: u32, right: u32) -> Lanes {
        Lanes {
            left,
            right,
            width: (left + right) as f64 * 4.0,
        }
    }

    fn individual(ways: Ways, signal: Signal, incoming: Lanes) -> Individual {
        let proposal = IntersectionProposal {
            last: [45.0, 0.0],
            center: [65.0, 0.0],
            straight: [75.0, 0.0],
            left: [65.0, 50.0],
            right: [65.0, -50.0],
            direction: Direction::Straight,
            ways,
            opposite: lanes(1, 1),
        };
        let control = TrafficControl {
            intersection_id: 7,
            signal,
        };
        Individual {
            roads: vec![
                RoadPiece::new(vec![[1.0, 0.0], [30.0, 0.0], [45.0, 0.0]], incoming, RoadKind::Normal),
                RoadPiece::new(vec![[75.0, 0.0], [100.0, 0.0]], incoming, RoadKind::Normal),
            ],
            intersections: vec![proposal.commit(incoming, control)],
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
    fn stop_sign_junction_puts_priority_on_the_crossing_road() {
        let config = GeneratorConfig::default();
        let ind = individual(Ways::Four, Signal::StopSign, lanes(1, 1));
        let (obstacles, triggers) = derive(&ind, &config);
        let kinds: Vec<_> = obstacles.iter().map(|o| (o.approach, o.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (ArmRole::Approach, ObstacleKind::StopSign),
                (ArmRole::Left, ObstacleKind::PrioritySign),
                (ArmRole::Straight, ObstacleKind::StopSign),
                (ArmRole::Right, ObstacleKind::PrioritySign),
            ]
        );
        assert!(obstacles.iter().all(|o| o.intersection_id == 7));
        assert_eq!(obstacles.iter().filter(|o| o.facing_ego).count(), 1);
        assert_eq!(triggers.len(), 1);
        assert!(matches!(triggers[0].action, TriggerAction::Stop { duration } if duration == 4.0));
    }

    #[test]
    fn ego_sign_stands_right_of_the_approach() {
        let config = GeneratorConfig::default();
        let ind = individual(Ways::Four, Signal::PrioritySign, lanes(1, 1));
        let (obstacles, triggers) = derive(&ind, &config);
        let ego = &obstacles[0];
        // Set back half the crossing road from the center, beside the road edge.
        assert!((ego.position[0] - (65.0 - 4.0 - 0.1)).abs() < 1e-9, "{:?}", ego.position);
        assert!((ego.position[1] + 4.2).abs() < 1e-9, "{:?}", ego.position);
        assert_eq!(ego.rotation, 360.0);
        assert!(triggers.is_empty());
    }

    #[test]
    fn three_way_skips_the_missing_arm() {
        let config = GeneratorConfig::default();
        let ind = individual(
            Ways::Three {
                layout: Direction::Left,
            },
            Signal::PrioritySign,
            lanes(1, 1),
        );
        let (obstacles, _) = derive(&ind, &config);
        let roles: Vec<_> = obstacles.iter().map(|o| o.approach).collect();
        assert_eq!(roles, vec![ArmRole::Approach, ArmRole::Left, ArmRole::Straight]);
    }

    #[test]
    fn manual_light_switches_and_others_stay_off() {
        let config = GeneratorConfig::default();
        let mode = LightMode::Manual {
            object_id: "traffic_light_manual_3".to_string(),
            initial: LightColor::Green,
        };
        let ind = individual(
            Ways::Four,
            Signal::Light {
                mode: mode.clone(),
                pole: PoleSign::Yield,
            },
            lanes(2, 2),
        );
        let (obstacles, triggers) = derive(&ind, &config);
        assert_eq!(
            obstacles[0].kind,
            ObstacleKind::DoubleTrafficLight {
                mode,
                pole: PoleSign::Yield
            }
        );
        assert_eq!(
            obstacles[1].kind,
            ObstacleKind::SingleTrafficLight {
                mode: LightMode::Off,
                pole: PoleSign::Priority
            }
        );
        let manual = obstacles.iter().filter(|o| o.kind.mode().is_some_and(|m| m.is_manual()));
        assert_eq!(manual.count(), 1);
        assert_eq!(
            triggers[0].action,
            TriggerAction::SwitchLights {
                object_id: "traffic_light_manual_3".to_string(),
                initial: LightColor::Green,
                switch_to: LightColor::Red,
            }
        );
        assert!(matches!(triggers[1].action, TriggerAction::Stop { .. }));
    }

    #[test]
    fn anchors_override_the_derived_placement() {
        let config = GeneratorConfig::default();
        let mut ind = individual(Ways::Four, Signal::StopSign, lanes(1, 1));
        let (before, _) = derive(&ind, &config);
        ind.anchors.push(ObstacleAnchor {
            intersection_id: 7,
            approach: ArmRole::Left,
            init_position: before[1].position,
            init_rotation: before[1].rotation,
            position: add(before[1].position, [1.0, 0.0]),
            rotation: before[1].rotation + 5.0,
        });
        let (after, _) = derive(&ind, &config);
        assert!((distance(after[1].position, before[1].position) - 1.0).abs() < 1e-9);
        assert_eq!(after[1].init_position, Some(before[1].position));
        assert_eq!(after[0], before[0]);
    }
}
