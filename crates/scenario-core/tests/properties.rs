use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

use scenario_core::generator::generate;
use scenario_core::geometry::distance;
use scenario_core::individual::{IdCounters, Individual};
use scenario_core::mutation::{lane_groups, mutate};
use scenario_core::road::{angle_window, RoadKind};
use scenario_core::traffic_control::Signal;
use scenario_core::GeneratorConfig;

fn population(seed: u64, count: usize, config: &GeneratorConfig) -> Vec<Individual> {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let mut counters = IdCounters::default();
    (0..count)
        .map(|_| generate(&mut rng, config, &mut counters))
        .collect()
}

#[test]
fn normal_roads_respect_segment_and_angle_bounds() {
    let config = GeneratorConfig::default();
    for individual in population(1, 5, &config) {
        for road in individual.roads.iter().filter(|r| r.kind == RoadKind::Normal) {
            for w in road.points.windows(2) {
                let d = distance(w[0], w[1]);
                assert!(
                    (config.min_segment_length..=config.max_segment_length).contains(&d),
                    "segment {d}"
                );
            }
            let (min, max) = angle_window(road.lane_count());
            for w in road.points.windows(3) {
                let a = scenario_core::geometry::turn_angle(w[0], w[1], w[2]);
                assert!((min..=max).contains(&a), "angle {a} outside [{min}, {max}]");
            }
        }
    }
}

#[test]
fn accepted_networks_pass_the_oracle_again() {
    let config = GeneratorConfig::default();
    for individual in population(2, 5, &config) {
        assert!(!individual.intersections.is_empty());
        assert!(individual.piece_count() >= config.min_nodes);
        let geometry = individual.network().geometry(&config);
        assert_eq!(geometry.validate(), Ok(()));
    }
}

#[test]
fn point_mutation_is_local() {
    let config = GeneratorConfig::default();
    let mut rng = ChaCha12Rng::seed_from_u64(40);
    let mut counters = IdCounters::default();
    for mut individual in population(3, 4, &config) {
        let before = individual.roads.clone();
        mutate(&mut individual, &mut rng, &config, &mut counters);
        assert_eq!(individual.roads.len(), before.len());
        for (road, old) in individual.roads.iter().zip(&before) {
            assert_eq!(road.points.len(), old.points.len());
            if !road.mutated {
                assert_eq!(road.points, old.points);
            }
        }
    }
}

#[test]
fn lane_groups_share_one_width() {
    let config = GeneratorConfig {
        mutation_probability: 1.0,
        ..GeneratorConfig::default()
    };
    let mut rng = ChaCha12Rng::seed_from_u64(41);
    let mut counters = IdCounters::default();
    for mut individual in population(4, 4, &config) {
        for _ in 0..3 {
            mutate(&mut individual, &mut rng, &config, &mut counters);
            for group in lane_groups(&individual) {
                let lanes = individual.roads[group.start].lanes();
                for k in group.clone() {
                    assert_eq!(individual.roads[k].lanes(), lanes, "road {k} in {group:?}");
                    if let Some(intersection) = individual.intersections.get(k) {
                        let approach = intersection.approach().expect("approach arm");
                        assert_eq!(approach.lanes(), lanes, "approach of junction {k}");
                    }
                }
            }
        }
    }
}

#[test]
fn signs_only_guard_single_lane_junctions_after_lane_mutation() {
    let config = GeneratorConfig {
        mutation_probability: 1.0,
        ..GeneratorConfig::default()
    };
    let mut rng = ChaCha12Rng::seed_from_u64(43);
    let mut counters = IdCounters::default();
    for mut individual in population(6, 4, &config) {
        for _ in 0..3 {
            mutate(&mut individual, &mut rng, &config, &mut counters);
            for intersection in &individual.intersections {
                if matches!(intersection.control.signal, Signal::Light { .. }) {
                    continue;
                }
                let incoming = intersection.approach().expect("approach arm").lanes();
                for lanes in [incoming, intersection.opposite] {
                    assert_eq!((lanes.left, lanes.right), (1, 1), "{:?}", intersection.control);
                }
            }
        }
    }
}

#[test]
fn obstacles_never_drift_from_their_first_placement() {
    let config = GeneratorConfig {
        mutation_probability: 1.0,
        ..GeneratorConfig::default()
    };
    let mut rng = ChaCha12Rng::seed_from_u64(42);
    let mut counters = IdCounters::default();
    let mut individual = population(5, 1, &config).remove(0);
    individual.derive(&config);
    for _ in 0..25 {
        mutate(&mut individual, &mut rng, &config, &mut counters);
        let scenario = individual.scenario.as_ref().expect("derived");
        for obstacle in &scenario.obstacles {
            if let (Some(init), Some(init_rotation)) = (obstacle.init_position, obstacle.init_rotation) {
                let drift = distance(obstacle.position, init);
                assert!(drift <= config.obstacle_position_bound + 1e-9, "drift {drift}");
                let turn = (obstacle.rotation - init_rotation).abs();
                assert!(turn <= config.obstacle_rotation_bound + 1e-9, "turn {turn}");
            }
        }
    }
}
