//! Parked cars along the borders of normal roads, drawn from an RNG seeded
//! with the individual's `parked_seed`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::geometry::{distance, heading, offset_polyline, point_polyline_distance, Point};
use crate::individual::Individual;
use crate::network::interpolate;

/// Cars are not placed closer than this to the end of a road.
const END_CLEARANCE: f64 = 12.0;
const SIDE_PROBABILITY: f64 = 0.7;
const DISCARD_PROBABILITY: f64 = 0.4;
const ANGLE_NOISE: i32 = 8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParkedCar {
    pub position: Point,
    /// Degrees counter-clockwise from +x.
    pub rotation: f64,
    pub road: usize,
    /// RGBA, shared by every parked car of one individual.
    pub color: [f64; 4],
}

/// Rotation relative to the road and the matching border offset and spacing.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ParkingStyle {
    rotation: f64,
    offset: f64,
    spacing: f64,
}

const STYLES: [ParkingStyle; 3] = [
    ParkingStyle {
        rotation: 0.0,
        offset: 2.0,
        spacing: 5.5,
    },
    ParkingStyle {
        rotation: 45.0,
        offset: 3.5,
        spacing: 4.0,
    },
    ParkingStyle {
        rotation: 90.0,
        offset: 3.0,
        spacing: 4.5,
    },
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn derive(individual: &Individual, config: &GeneratorConfig) -> Vec<ParkedCar> {
    let mut rng = ChaCha12Rng::seed_from_u64(individual.parked_seed);
    let color = [
        round2(rng.random()),
        round2(rng.random()),
        round2(rng.random()),
        round2(rng.random_range(1.0..=1.3)),
    ];

    let mut cars = Vec::new();
    for (k, road) in individual.roads.iter().enumerate() {
        if road.points.len() < 2 || road.is_closed() {
            continue;
        }
        let style = STYLES[rng.random_range(0..STYLES.len())];
        let centerline = interpolate(road, config).points;
        // Exit arm that leads into this road.
        let previous = k
            .checked_sub(1)
            .and_then(|p| individual.intersections.get(p))
            .and_then(|i| i.exit())
            .map(|exit| (interpolate(exit, config).points, exit.width));

        for side in [1.0, -1.0] {
            if !rng.random_bool(SIDE_PROBABILITY) {
                continue;
            }
            let lines: Vec<Vec<Point>> = (-10..10)
                .map(|x| {
                    let lateral = road.width / 2.0 + style.offset + x as f64 / 10.0;
                    offset_polyline(&centerline, side * lateral)
                })
                .collect();
            let Some(&end) = centerline.last() else {
                continue;
            };

            let mut last: Option<Point> = None;
            for i in 0..centerline.len() - 1 {
                if distance(centerline[i], end) < END_CLEARANCE {
                    break;
                }
                let line = &lines[rng.random_range(0..lines.len())];
                let position = line[i];
                if last.is_some_and(|l| distance(l, position) < style.spacing) {
                    continue;
                }
                if let Some((prev, width)) = &previous {
                    if point_polyline_distance(position, prev) < width / 2.0 + style.offset {
                        continue;
                    }
                }
                last = Some(position);
                if rng.random_bool(DISCARD_PROBABILITY) {
                    continue;
                }

                let noise = rng.random_range(-ANGLE_NOISE..=ANGLE_NOISE) as f64;
                let mut rotation = heading(centerline[i], centerline[i + 1]) - style.rotation + noise;
                if side > 0.0 {
                    rotation += 180.0;
                }
                cars.push(ParkedCar {
                    position,
                    rotation,
                    road: k,
                    color,
                });
            }
        }
    }
    cars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Stage;
    use crate::road::{Lanes, RoadKind, RoadPiece};

    fn individual(seed: u64) -> Individual {
        let lanes = Lanes {
            left: 1,
            right: 1,
            width: 8.0,
        };
        Individual {
            roads: vec![RoadPiece::new(
                vec![[0.0, 0.0], [30.0, 0.0], [60.0, 0.0], [90.0, 0.0]],
                lanes,
                RoadKind::Normal,
            )],
            intersections: Vec::new(),
            time_of_day: 0.5,
            traffic_seed: 1,
            parked_seed: seed,
            anchors: Vec::new(),
            fitness: 0.0,
            stage: Stage::Generated,
            scenario: None,
        }
    }

    #[test]
    fn cars_keep_to_the_borders() {
        let config = GeneratorConfig::default();
        for seed in 0..20 {
            for car in derive(&individual(seed), &config) {
                let lateral = car.position[1].abs();
                // Half width 4, border offset 2..3.5, noise -1.0..0.9.
                assert!((5.0 - 1e-9..=8.4 + 1e-9).contains(&lateral), "seed {seed}: {car:?}");
                assert!(car.position[0] <= 78.0 + 1e-9, "seed {seed}: {car:?}");
            }
        }
    }

    #[test]
    fn cars_share_one_color() {
        let config = GeneratorConfig::default();
        let cars: Vec<_> = (0..20).flat_map(|s| derive(&individual(s), &config)).collect();
        assert!(!cars.is_empty());
        for seed in 0..20 {
            let cars = derive(&individual(seed), &config);
            if let Some(first) = cars.first() {
                assert!(cars.iter().all(|c| c.color == first.color));
                assert!((1.0..=1.3).contains(&first.color[3]));
            }
        }
    }

    #[test]
    fn parked_seed_drives_the_layout() {
        let config = GeneratorConfig::default();
        assert_eq!(derive(&individual(4), &config), derive(&individual(4), &config));
    }
}
