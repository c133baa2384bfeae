//! Mutation operators. Structural operators edit the road graph and are
//! reverted when the result breaks a constraint; cosmetic operators only
//! touch seeds, light modes and obstacle placement.

use std::ops::Range;

use rand::Rng;
use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::error::Rejection;
use crate::generator::{flat_index_of_road, sample_point};
use crate::geometry::{add, rotate, Point};
use crate::individual::{IdCounters, Individual, ObstacleAnchor};
use crate::intersection::{ArmRole, Direction};
use crate::retry::with_retries;
use crate::road::{check_segment_length, check_turn, Lanes, RoadKind};

/// What one call to [`mutate`] changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub points: usize,
    pub lane_groups: usize,
    pub obstacles: usize,
    pub light_modes: usize,
    pub reseeds: usize,
}

/// Mutate one individual in place and re-derive its scenario.
pub fn mutate(
    individual: &mut Individual,
    rng: &mut impl Rng,
    config: &GeneratorConfig,
    counters: &mut IdCounters,
) -> MutationReport {
    for road in &mut individual.roads {
        road.mutated = false;
    }
    for arm in individual.intersections.iter_mut().flat_map(|i| i.arms.iter_mut()) {
        arm.piece.mutated = false;
    }
    individual.invalidate();

    let mut report = MutationReport {
        points: mutate_points(individual, rng, config),
        lane_groups: mutate_lanes(individual, rng, config, counters),
        ..MutationReport::default()
    };

    individual.derive(config);
    report.obstacles = perturb_obstacles(individual, rng, config);
    for intersection in &mut individual.intersections {
        if rng.random_bool(config.mutation_probability)
            && intersection.control.mutate_mode(rng, counters)
        {
            report.light_modes += 1;
        }
    }
    if rng.random_bool(config.mutation_probability) {
        individual.parked_seed = rng.random();
        report.reseeds += 1;
    }
    if rng.random_bool(config.mutation_probability) {
        individual.traffic_seed = rng.random();
        report.reseeds += 1;
    }
    if rng.random_bool(config.mutation_probability) {
        individual.time_of_day = rng.random();
    }
    individual.derive(config);

    trace!(?report, "individual mutated");
    report
}

/// Control points a point mutation may move on road `k`: never the
/// endpoints, never the fixed opening of road 0 and never the point that
/// fixes the approach direction of the road's intersection.
pub fn free_points(individual: &Individual, k: usize) -> Range<usize> {
    let Some(road) = individual.roads.get(k) else {
        return 0..0;
    };
    let start = if k == 0 { 2 } else { 1 };
    let end = if k < individual.intersections.len() {
        road.points.len().saturating_sub(2)
    } else {
        road.points.len().saturating_sub(1)
    };
    start..end.max(start)
}

fn mutate_points(individual: &mut Individual, rng: &mut impl Rng, config: &GeneratorConfig) -> usize {
    let movable = individual
        .control_point_count()
        .saturating_sub(2 + individual.intersections.len())
        .max(1);
    let probability = 1.0 / movable as f64;

    let mut moved = 0;
    for k in 0..individual.roads.len() {
        for j in free_points(individual, k) {
            if !rng.random_bool(probability) {
                continue;
            }
            let original = individual.roads[k].points[j];
            match with_retries(config.max_tries, |_| try_move(individual, &mut *rng, config, k, j)) {
                Ok(point) => {
                    individual.roads[k].mutated = true;
                    moved += 1;
                    trace!(road = k, index = j, x = point[0], y = point[1], "point moved");
                }
                Err(e) => {
                    individual.roads[k].points[j] = original;
                    debug!(road = k, index = j, %e, "point mutation rejected");
                }
            }
        }
    }
    moved
}

/// Propose a new position for point `j` of road `k`; leaves the candidate in
/// place only if every constraint holds.
fn try_move(
    individual: &mut Individual,
    rng: &mut impl Rng,
    config: &GeneratorConfig,
    k: usize,
    j: usize,
) -> Result<Point, Rejection> {
    let road = &individual.roads[k];
    let prev = road.points[j - 1];
    let next = road.points[j + 1];
    let after = road.points.get(j + 2).copied();
    let penultimate = if j >= 2 {
        Some(road.points[j - 2])
    } else {
        k.checked_sub(1)
            .and_then(|p| individual.intersections.get(p))
            .map(|i| i.center)
    };
    let window = road.angle_window();
    let original = road.points[j];

    let candidate = sample_point(rng, prev, penultimate, window, config)?;
    check_segment_length(candidate, next, config)?;
    check_turn(prev, candidate, next, window)?;
    if let Some(after) = after {
        check_turn(candidate, next, after, window)?;
    }

    individual.roads[k].points[j] = candidate;
    let verdict = check_moved(individual, config, k, [prev, candidate, next]);
    if verdict.is_err() {
        individual.roads[k].points[j] = original;
    }
    verdict.map(|()| candidate)
}

fn check_moved(
    individual: &Individual,
    config: &GeneratorConfig,
    k: usize,
    [prev, candidate, next]: [Point; 3],
) -> Result<(), Rejection> {
    let network = individual.network();
    let own = flat_index_of_road(&individual.intersections, k);
    let geometry = network.geometry(config);
    geometry.check_new_line(prev, candidate, 0, &[prev], |piece| piece == own)?;
    geometry.check_new_line(candidate, next, 0, &[next], |piece| piece == own)?;
    geometry.validate()
}

/// Runs of consecutive roads joined by straight intersections. They share
/// one lane layout.
pub fn lane_groups(individual: &Individual) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for (k, intersection) in individual.intersections.iter().enumerate() {
        if intersection.direction != Direction::Straight {
            groups.push(start..k + 1);
            start = k + 1;
        }
    }
    if start < individual.roads.len() {
        groups.push(start..individual.roads.len());
    }
    groups
}

/// Give every piece that carries the lanes of `group` the layout `lanes`.
/// Returns the intersections whose arms changed.
fn apply_lanes(individual: &mut Individual, group: Range<usize>, lanes: Lanes) -> Vec<usize> {
    let mut touched = Vec::new();
    for k in group.clone() {
        individual.roads[k].set_lanes(lanes);
        individual.roads[k].mutated = true;
        if let Some(intersection) = individual.intersections.get_mut(k) {
            for arm in &mut intersection.arms {
                if matches!(arm.role, ArmRole::Approach | ArmRole::Straight) {
                    arm.piece.set_lanes(lanes);
                    arm.piece.mutated = true;
                }
            }
            touched.push(k);
        }
    }
    // A group that starts after a turn continues on the crossing road of
    // that junction.
    if let Some(p) = group.start.checked_sub(1) {
        if let Some(intersection) = individual.intersections.get_mut(p) {
            let exit = intersection.direction.arm();
            intersection.opposite = lanes;
            for arm in &mut intersection.arms {
                match arm.role {
                    ArmRole::Left | ArmRole::Right if arm.role == exit => arm.piece.set_lanes(lanes),
                    ArmRole::Left | ArmRole::Right => arm.piece.set_lanes(lanes.mirrored()),
                    _ => continue,
                }
                arm.piece.mutated = true;
            }
            touched.push(p);
        }
    }
    touched
}

fn mutate_lanes(
    individual: &mut Individual,
    rng: &mut impl Rng,
    config: &GeneratorConfig,
    counters: &mut IdCounters,
) -> usize {
    let mut mutated = 0;
    for group in lane_groups(individual) {
        if !rng.random_bool(config.mutation_probability) {
            continue;
        }
        let lanes = Lanes::sample(rng, config);
        let backup = (individual.roads.clone(), individual.intersections.clone());
        let touched = apply_lanes(individual, group.clone(), lanes);

        let verdict = individual.roads[group.clone()]
            .iter()
            .filter(|r| r.kind == RoadKind::Normal)
            .try_for_each(|r| r.check_shape(config))
            .and_then(|()| individual.network().geometry(config).validate());
        match verdict {
            Ok(()) => {
                let ids: Vec<u32> = touched
                    .iter()
                    .map(|&i| individual.intersections[i].control.intersection_id)
                    .collect();
                individual.anchors.retain(|a| !ids.contains(&a.intersection_id));
                for &i in &touched {
                    let intersection = &mut individual.intersections[i];
                    let Some(incoming) = intersection.approach().map(|a| a.lanes()) else {
                        continue;
                    };
                    let opposite = intersection.opposite;
                    if intersection.control.fit_lanes(rng, incoming, opposite, counters) {
                        debug!(junction = i, "sign replaced by a light after lane change");
                    }
                }
                mutated += 1;
                trace!(?group, ?lanes, "lane group mutated");
            }
            Err(reason) => {
                (individual.roads, individual.intersections) = backup;
                debug!(?group, %reason, "lane mutation rejected");
            }
        }
    }
    mutated
}

/// Move or turn obstacles, always around their first-ever placement.
fn perturb_obstacles(individual: &mut Individual, rng: &mut impl Rng, config: &GeneratorConfig) -> usize {
    let Some(scenario) = &individual.scenario else {
        return 0;
    };
    let placements: Vec<_> = scenario
        .obstacles
        .iter()
        .map(|o| (o.intersection_id, o.approach, o.position, o.rotation))
        .collect();

    let mut perturbed = 0;
    for (intersection_id, approach, position, rotation) in placements {
        if !rng.random_bool(config.mutation_probability) {
            continue;
        }
        let (init_position, init_rotation) = individual
            .anchor(intersection_id, approach)
            .map_or((position, rotation), |a| (a.init_position, a.init_rotation));
        let radius = rng.random_range(0.0..=config.obstacle_position_bound);
        let angle = rng.random_range(0.0..360.0);
        let new_position = add(init_position, rotate([radius, 0.0], angle));
        let bound = config.obstacle_rotation_bound;
        let new_rotation = init_rotation + rng.random_range(-bound..=bound);

        match individual
            .anchors
            .iter_mut()
            .find(|a| a.intersection_id == intersection_id && a.approach == approach)
        {
            Some(anchor) => {
                anchor.position = new_position;
                anchor.rotation = new_rotation;
            }
            None => individual.anchors.push(ObstacleAnchor {
                intersection_id,
                approach,
                init_position,
                init_rotation,
                position: new_position,
                rotation: new_rotation,
            }),
        }
        perturbed += 1;
    }
    perturbed
}
