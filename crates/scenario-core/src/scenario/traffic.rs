//! Traffic participants besides the ego car. Every random choice comes from
//! an RNG seeded with the individual's `traffic_seed`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::config::GeneratorConfig;
use crate::geometry::{turn_angle, Point};
use crate::individual::Individual;
use crate::intersection::{ArmRole, Direction, Intersection};
use crate::network::interpolate;
use crate::road::RoadPiece;
use crate::scenario::ego::ego_lane;
use crate::scenario::speed::assign_speeds;
use crate::scenario::{
    lane_path, push_spaced, start_pose, LaneChoice, Participant, ParticipantId, Trigger,
    TriggerAction, Waypoint,
};
use crate::traffic_control::Action;

pub const PALETTE: [&str; 9] = [
    "White", "Red", "Green", "Yellow", "Black", "Blue", "Orange", "Gray", "Purple",
];

/// Samples cut from the center end of an inbound cross-traffic path.
const INBOUND_TRIM: usize = 9;
const INBOUND_TRIM_LEFT_TURN: usize = 4;

pub fn derive(individual: &Individual, config: &GeneratorConfig) -> (Vec<Participant>, Vec<Trigger>) {
    let mut rng = ChaCha12Rng::seed_from_u64(individual.traffic_seed);
    let mut participants = Vec::new();
    let mut triggers = Vec::new();
    if let Some((p, t)) = cross_traffic(&mut rng, individual, config) {
        participants.push(p);
        triggers.extend(t);
    }
    if let Some((p, t)) = oncoming(&mut rng, individual, config) {
        participants.push(p);
        triggers.extend(t);
    }
    (participants, triggers)
}

fn pick_color(rng: &mut impl Rng) -> String {
    PALETTE[rng.random_range(0..PALETTE.len())].to_string()
}

/// The same piece driven the other way.
fn reversed(piece: &RoadPiece) -> RoadPiece {
    let mut points = piece.points.clone();
    points.reverse();
    RoadPiece::new(points, piece.lanes().mirrored(), piece.kind)
}

fn participant_lane(piece: &RoadPiece, choice: LaneChoice, config: &GeneratorConfig) -> Vec<Point> {
    lane_path(
        &interpolate(piece, config).points,
        piece.lanes(),
        choice,
        config.participant_samples,
        config,
    )
}

/// Appends one leg, remembering where the participant teleports so the run-up
/// to the jump can be zeroed.
fn push_leg(waypoints: &mut Vec<Waypoint>, halts: &mut Vec<usize>, leg: &[Point], road: usize) {
    if !waypoints.is_empty() {
        halts.push(waypoints.len());
    }
    push_spaced(waypoints, leg, road);
}

/// Cross traffic: at every junction where the ego car has to stop, a car
/// enters from a side arm and leaves through another one once the ego car
/// reaches the approach.
fn cross_traffic(
    rng: &mut impl Rng,
    individual: &Individual,
    config: &GeneratorConfig,
) -> Option<(Participant, Vec<Trigger>)> {
    let color = pick_color(rng);
    let mut waypoints = Vec::new();
    let mut halts = Vec::new();
    let mut triggers = Vec::new();
    let mut spawn_roads = Vec::new();
    let mut init = None;

    for (k, intersection) in individual.intersections.iter().enumerate() {
        if intersection.control.action() != Action::Stop {
            continue;
        }
        let Some((inbound, outbound)) = crossing_legs(rng, intersection, config) else {
            continue;
        };
        let Some(spawn) = start_pose(&inbound) else {
            continue;
        };
        let choice = if intersection.direction == Direction::Left {
            LaneChoice::TurnLeft
        } else {
            LaneChoice::Right
        };
        let Some(gate) = intersection
            .approach()
            .and_then(|a| ego_lane(a, choice, config).first().copied())
        else {
            continue;
        };

        init.get_or_insert(spawn);
        spawn_roads.push(k);
        push_leg(&mut waypoints, &mut halts, &inbound, k);
        push_spaced(&mut waypoints, &outbound, k);
        triggers.push(Trigger::by_ego(
            gate,
            TriggerAction::SpawnAndStart {
                participant: ParticipantId::CrossTraffic,
                spawn,
            },
        ));
    }

    let init = init?;
    assign_speeds(&mut waypoints, &halts);
    Some((
        Participant {
            id: ParticipantId::CrossTraffic,
            init,
            waypoints,
            color,
            end_roads: spawn_roads.clone(),
            spawn_roads,
        },
        triggers,
    ))
}

/// Inbound path on a random side arm toward the center, outbound path along
/// a different random arm.
fn crossing_legs(
    rng: &mut impl Rng,
    intersection: &Intersection,
    config: &GeneratorConfig,
) -> Option<(Vec<Point>, Vec<Point>)> {
    let sources: Vec<_> = intersection
        .arms
        .iter()
        .filter(|a| a.role != ArmRole::Approach)
        .collect();
    if sources.is_empty() {
        return None;
    }
    let source = sources[rng.random_range(0..sources.len())];
    let targets: Vec<_> = intersection
        .arms
        .iter()
        .filter(|a| a.role != source.role)
        .collect();
    let target = targets[rng.random_range(0..targets.len())];

    let inbound_piece = reversed(&source.piece);
    let turn = turn_angle(
        intersection.corner(source.role),
        intersection.center,
        intersection.corner(target.role),
    );
    let left_turn = (240.0..=300.0).contains(&turn) && inbound_piece.right_lanes > 1;
    let (choice, trim) = if left_turn {
        (LaneChoice::TurnLeft, INBOUND_TRIM_LEFT_TURN)
    } else {
        (LaneChoice::Right, INBOUND_TRIM)
    };
    let mut inbound = participant_lane(&inbound_piece, choice, config);
    inbound.truncate(inbound.len().saturating_sub(trim).max(1));

    // The approach arm is stored running into the center.
    let outbound = if target.role == ArmRole::Approach {
        participant_lane(&reversed(&target.piece), LaneChoice::Right, config)
    } else {
        participant_lane(&target.piece, LaneChoice::Right, config)
    };
    let skip = outbound.len() / 10;
    Some((inbound, outbound[skip..].to_vec()))
}

/// Oncoming traffic: every normal road driven in reverse on its own right
/// lane, spawned when the ego car enters the road at the start of its lane.
fn oncoming(
    rng: &mut impl Rng,
    individual: &Individual,
    config: &GeneratorConfig,
) -> Option<(Participant, Vec<Trigger>)> {
    let color = pick_color(rng);
    let mut waypoints = Vec::new();
    let mut halts = Vec::new();
    let mut triggers = Vec::new();
    let mut init = None;
    let mut roads = Vec::new();

    for (k, road) in individual.roads.iter().enumerate() {
        if road.points.len() < 2 {
            continue;
        }
        let lane = participant_lane(&reversed(road), LaneChoice::Right, config);
        let path = &lane[lane.len() / 10..];
        let gate = ego_lane(road, LaneChoice::Right, config).first().copied();
        let (Some(spawn), Some(gate)) = (start_pose(path), gate) else {
            continue;
        };
        init.get_or_insert(spawn);
        roads.push(k);
        push_leg(&mut waypoints, &mut halts, path, k);
        triggers.push(Trigger::by_ego(
            gate,
            TriggerAction::SpawnAndStart {
                participant: ParticipantId::Oncoming,
                spawn,
            },
        ));
    }

    let init = init?;
    assign_speeds(&mut waypoints, &halts);
    Some((
        Participant {
            id: ParticipantId::Oncoming,
            init,
            waypoints,
            color,
            spawn_roads: roads.clone(),
            end_roads: roads,
        },
        triggers,
    ))
}
