//! Road-network growth: one control point or one intersection at a time,
//! every proposal gated by the validity oracle.

use rand::Rng;
use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, Rejection};
use crate::geometry::{distance, Point};
use crate::individual::{IdCounters, Individual, Stage};
use crate::intersection::{Intersection, IntersectionProposal};
use crate::network::RoadNetwork;
use crate::retry::with_retries;
use crate::road::{check_segment_length, check_turn, Lanes, RoadKind, RoadPiece};
use crate::traffic_control::TrafficControl;

/// Fixed opening of every network.
pub const START_POINTS: [Point; 3] = [[1.0, 0.0], [30.0, 0.0], [45.0, 0.0]];

/// Sample a candidate next point in the integer box of side
/// `2 * max_segment_length` around `last`, accepting only points that keep
/// the segment length and, when `penultimate` is known, the turn angle.
pub fn sample_point(
    rng: &mut impl Rng,
    last: Point,
    penultimate: Option<Point>,
    window: (f64, f64),
    config: &GeneratorConfig,
) -> Result<Point, Rejection> {
    let reach = config.max_segment_length;
    let x_min = (last[0] - reach).round() as i64;
    let x_max = (last[0] + reach).round() as i64;
    let y_min = (last[1] - reach).round() as i64;
    let y_max = (last[1] + reach).round() as i64;

    let mut reason = Rejection::SegmentLength;
    for _ in 0..config.max_tries {
        let point = [
            rng.random_range(x_min..=x_max) as f64,
            rng.random_range(y_min..=y_max) as f64,
        ];
        if let Err(r) = check_segment_length(last, point, config) {
            reason = r;
            continue;
        }
        if let Some(prev) = penultimate {
            if let Err(r) = check_turn(prev, last, point, window) {
                reason = r;
                continue;
            }
        }
        return Ok(point);
    }
    Err(reason)
}

/// Network under construction: same shape as [`Individual`], except that
/// the last road may still hold a single point.
struct Build {
    roads: Vec<RoadPiece>,
    intersections: Vec<Intersection>,
}

impl Build {
    fn new(lanes: Lanes) -> Self {
        Self {
            roads: vec![RoadPiece::new(START_POINTS.to_vec(), lanes, RoadKind::Normal)],
            intersections: Vec::new(),
        }
    }

    fn current(&self) -> &RoadPiece {
        // `roads` is never empty.
        &self.roads[self.roads.len() - 1]
    }

    /// Point before the growth tip: the previous control point, or the
    /// intersection center for a road that only holds its start point.
    fn penultimate(&self) -> Option<Point> {
        let points = &self.current().points;
        if points.len() >= 2 {
            Some(points[points.len() - 2])
        } else {
            self.intersections.last().map(|i| i.center)
        }
    }

    fn try_grow(&mut self, rng: &mut impl Rng, config: &GeneratorConfig) -> Result<Point, Rejection> {
        let road = self.current();
        let last = road.last().ok_or(Rejection::Degenerate)?;
        let point = sample_point(rng, last, self.penultimate(), road.angle_window(), config)?;

        let current = self.roads.len() - 1;
        self.roads[current].points.push(point);
        let verdict = self.check_growth(current, last, point, config);
        if verdict.is_err() {
            self.roads[current].points.pop();
        }
        verdict.map(|()| point)
    }

    fn check_growth(
        &self,
        road: usize,
        last: Point,
        point: Point,
        config: &GeneratorConfig,
    ) -> Result<(), Rejection> {
        let network = RoadNetwork::new(&self.roads, &self.intersections);
        let flat = flat_index_of_road(&self.intersections, road);
        let geometry = network.geometry(config);
        geometry.check_new_line(last, point, 0, &[last], |piece| piece == flat)?;
        geometry.validate()
    }

    fn try_intersection(
        &self,
        rng: &mut impl Rng,
        config: &GeneratorConfig,
    ) -> Result<IntersectionProposal, Rejection> {
        let road = self.current();
        let [.., penultimate, last] = road.points.as_slice() else {
            return Err(Rejection::Degenerate);
        };
        let proposal = IntersectionProposal::sample(rng, *penultimate, *last, config)
            .ok_or(Rejection::Degenerate)?;
        let arms = proposal.arms(road.lanes());
        let network = RoadNetwork::new(&self.roads, &self.intersections);
        let first_arm = network.len();
        let geometry = network
            .with_group(arms.iter().map(|a| &a.piece))
            .geometry(config);
        for (a, b) in proposal.probe_lines() {
            geometry.check_new_line(a, b, 0, &[*last], |piece| piece >= first_arm)?;
        }
        geometry.validate()?;
        Ok(proposal)
    }

    fn commit_intersection(
        &mut self,
        proposal: IntersectionProposal,
        rng: &mut impl Rng,
        counters: &mut IdCounters,
    ) {
        let incoming = self.current().lanes();
        let control = TrafficControl::sample(rng, incoming, proposal.opposite, counters);
        let next = RoadPiece::new(
            vec![proposal.exit_point()],
            proposal.exit_lanes(incoming),
            RoadKind::Normal,
        );
        self.intersections.push(proposal.commit(incoming, control));
        self.roads.push(next);
    }
}

/// Flat network index of normal road `road`: every earlier road is followed
/// by the arms of its intersection.
pub fn flat_index_of_road(intersections: &[Intersection], road: usize) -> usize {
    road + intersections[..road.min(intersections.len())]
        .iter()
        .map(|i| i.arms.len())
        .sum::<usize>()
}

/// One generation attempt. Fails when a growth step runs out of tries
/// before the network is usable or the result violates an invariant.
pub fn attempt(
    rng: &mut impl Rng,
    config: &GeneratorConfig,
    counters: &mut IdCounters,
) -> Result<Individual, GenerationError> {
    let mut build = Build::new(Lanes::sample(rng, config));
    let mut pieces = START_POINTS.len();
    let mut intersection_possible = true;

    while pieces < config.max_nodes || build.current().points.len() < 2 {
        let has_two = build.current().points.len() >= 2;
        let forced = pieces + 1 == config.max_nodes && build.intersections.is_empty();
        if intersection_possible
            && has_two
            && (forced || rng.random_bool(config.intersection_probability))
        {
            let tries = if forced { config.max_tries } else { 1 };
            match with_retries(tries, |_| build.try_intersection(&mut *rng, config)) {
                Ok(proposal) => {
                    build.commit_intersection(proposal, &mut *rng, counters);
                    pieces += 1;
                    trace!(pieces, "intersection accepted");
                }
                Err(e) => trace!(%e, "intersection rejected"),
            }
            intersection_possible = false;
        }

        match with_retries(config.max_tries, |_| build.try_grow(&mut *rng, config)) {
            Ok(point) => {
                pieces += 1;
                intersection_possible = true;
                trace!(pieces, x = point[0], y = point[1], "point accepted");
            }
            Err(e) if build.current().points.len() < 2 => return Err(e),
            Err(_) => break,
        }
    }

    let individual = Individual {
        roads: build.roads,
        intersections: build.intersections,
        time_of_day: rng.random(),
        traffic_seed: rng.random(),
        parked_seed: rng.random(),
        anchors: Vec::new(),
        fitness: 0.0,
        stage: Stage::Generated,
        scenario: None,
    };
    individual.check_invariants(config)?;
    Ok(individual)
}

/// Generate one valid individual, restarting from an empty network until an
/// attempt succeeds.
pub fn generate(rng: &mut impl Rng, config: &GeneratorConfig, counters: &mut IdCounters) -> Individual {
    let mut restarts = 0usize;
    loop {
        match attempt(rng, config, counters) {
            Ok(individual) => {
                debug!(
                    restarts,
                    roads = individual.roads.len(),
                    intersections = individual.intersections.len(),
                    "generated road network"
                );
                return individual;
            }
            Err(e) => {
                restarts += 1;
                debug!(%e, restarts, "generation attempt abandoned, restarting");
            }
        }
    }
}

/// Distance the ego car travels along the control polygon of the normal
/// roads; a cheap size measure used by logging and the spike evaluator.
pub fn control_length(individual: &Individual) -> f64 {
    individual
        .roads
        .iter()
        .flat_map(|r| r.points.windows(2))
        .map(|w| distance(w[0], w[1]))
        .sum()
}
