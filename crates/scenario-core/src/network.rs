//! Flattened view of a road graph: every normal road and intersection arm as
//! one indexed piece, plus the intersection groups exempt from mutual overlap
//! checks.

use crate::config::GeneratorConfig;
use crate::intersection::Intersection;
use crate::road::RoadPiece;
use crate::spline::b_spline;
use crate::validity::{InterpolatedPiece, NetworkGeometry};

/// Pieces in flat order: road 0, arms of intersection 0, road 1, ...
pub struct RoadNetwork<'a> {
    pieces: Vec<&'a RoadPiece>,
    groups: Vec<Vec<usize>>,
}

impl<'a> RoadNetwork<'a> {
    pub fn new(roads: &'a [RoadPiece], intersections: &'a [Intersection]) -> Self {
        let mut network = Self {
            pieces: Vec::new(),
            groups: Vec::new(),
        };
        for (k, road) in roads.iter().enumerate() {
            network.pieces.push(road);
            if let Some(intersection) = intersections.get(k) {
                network = network.with_group(intersection.pieces());
            }
        }
        network
    }

    /// Append pieces that meet at one junction.
    pub fn with_group(mut self, arms: impl IntoIterator<Item = &'a RoadPiece>) -> Self {
        let start = self.pieces.len();
        self.pieces.extend(arms);
        self.groups.push((start..self.pieces.len()).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn pieces(&self) -> &[&'a RoadPiece] {
        &self.pieces
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// Interpolate every piece and index the result for validity checks.
    pub fn geometry(&self, config: &GeneratorConfig) -> NetworkGeometry {
        let interpolated = self
            .pieces
            .iter()
            .map(|piece| interpolate(piece, config))
            .collect();
        NetworkGeometry::new(interpolated, &self.groups, config.corridor_scale)
    }
}

/// Sampled centerline of a piece; a single-point road stays a single point.
pub fn interpolate(piece: &RoadPiece, config: &GeneratorConfig) -> InterpolatedPiece {
    let points = if piece.points.len() >= 2 {
        b_spline(&piece.points, piece.samples(config), config.spline_degree)
    } else {
        piece.points.clone()
    };
    InterpolatedPiece {
        points,
        width: piece.width,
    }
}
