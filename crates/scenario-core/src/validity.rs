//! Geometric validity oracle. Every check runs on freshly interpolated
//! geometry, never on raw control points, because interpolation can bend a
//! road into places its control polygon does not reach.

use rstar::RTree;

use crate::error::Rejection;
use crate::geometry::{add, normalize, same_point, scale, sub, Point};
use crate::spatial::{self, IndexedSegment};

/// Sampled centerline of one road piece.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolatedPiece {
    pub points: Vec<Point>,
    pub width: f64,
}

impl InterpolatedPiece {
    fn endpoints(&self) -> Option<(Point, Point)> {
        Some((*self.points.first()?, *self.points.last()?))
    }
}

/// Width lines of a piece: one per sample, perpendicular to the local
/// segment, reaching `corridor_scale * width / 2` to either side.
pub fn width_lines(piece: &InterpolatedPiece, corridor_scale: f64) -> Vec<(Point, Point)> {
    let points = &piece.points;
    if points.len() < 2 {
        return Vec::new();
    }
    let half = corridor_scale * piece.width / 2.0;
    let mut lines = Vec::with_capacity(points.len());
    for (k, &p) in points.iter().enumerate() {
        let dir = if k + 1 < points.len() {
            sub(points[k + 1], p)
        } else {
            sub(p, points[k - 1])
        };
        let Some(dir) = normalize(dir) else {
            continue;
        };
        let normal = [-dir[1], dir[0]];
        lines.push((add(p, scale(normal, half)), add(p, scale(normal, -half))));
    }
    lines
}

/// Interpolated road network plus its declared intersection groups, indexed
/// once so every check shares the same R*-tree.
pub struct NetworkGeometry {
    pieces: Vec<InterpolatedPiece>,
    group_of: Vec<Option<usize>>,
    tree: RTree<IndexedSegment>,
    corridor_scale: f64,
}

impl NetworkGeometry {
    pub fn new(pieces: Vec<InterpolatedPiece>, groups: &[Vec<usize>], corridor_scale: f64) -> Self {
        let mut group_of = vec![None; pieces.len()];
        for (g, members) in groups.iter().enumerate() {
            for &m in members {
                if let Some(slot) = group_of.get_mut(m) {
                    *slot = Some(g);
                }
            }
        }
        let tree = spatial::build_index(
            pieces
                .iter()
                .enumerate()
                .map(|(i, p)| (i, p.points.as_slice())),
        );
        Self {
            pieces,
            group_of,
            tree,
            corridor_scale,
        }
    }

    pub fn pieces(&self) -> &[InterpolatedPiece] {
        &self.pieces
    }

    fn same_group(&self, a: usize, b: usize) -> bool {
        a != b && self.group_of[a].is_some() && self.group_of[a] == self.group_of[b]
    }

    /// True if `p` is an endpoint shared by pieces `a` and `b`.
    fn shared_endpoint(&self, a: usize, b: usize, p: Point) -> bool {
        let (Some((a0, a1)), Some((b0, b1))) = (self.pieces[a].endpoints(), self.pieces[b].endpoints())
        else {
            return false;
        };
        [a0, a1]
            .into_iter()
            .filter(|&ea| same_point(ea, p))
            .any(|ea| [b0, b1].into_iter().any(|eb| same_point(ea, eb)))
    }

    /// Self-intersection check for a newly proposed line: count the existing
    /// segments it crosses, ignoring crossings at any of the `ignore` points
    /// (the line's own origin) and segments of pieces matching `skip`.
    pub fn check_new_line(
        &self,
        a: Point,
        b: Point,
        max_crossings: usize,
        ignore: &[Point],
        skip: impl Fn(usize) -> bool,
    ) -> Result<(), Rejection> {
        let mut crossings = 0;
        for (seg, crossing) in spatial::query_crossings(&self.tree, a, b) {
            if skip(seg.piece) {
                continue;
            }
            if crossing
                .points()
                .all(|p| ignore.iter().any(|&origin| same_point(p, origin)))
            {
                continue;
            }
            crossings += 1;
            if crossings > max_crossings {
                return Err(Rejection::CenterlineCrossing);
            }
        }
        Ok(())
    }

    /// Width lines of every piece may cross centerlines in at most one
    /// distinct point (their own origin), except where both pieces belong to
    /// one intersection group.
    pub fn check_corridors(&self) -> Result<(), Rejection> {
        for (a, piece) in self.pieces.iter().enumerate() {
            for (w0, w1) in width_lines(piece, self.corridor_scale) {
                let mut hits: Vec<Point> = Vec::new();
                for (seg, crossing) in spatial::query_crossings(&self.tree, w0, w1) {
                    if self.same_group(a, seg.piece) {
                        continue;
                    }
                    for p in crossing.points() {
                        if !hits.iter().any(|&h| same_point(h, p)) {
                            hits.push(p);
                        }
                    }
                    if hits.len() >= 2 {
                        return Err(Rejection::CorridorOverlap);
                    }
                }
            }
        }
        Ok(())
    }

    /// No two centerlines may cross unless they share an intersection group
    /// or meet at a common endpoint.
    pub fn check_centerlines(&self) -> Result<(), Rejection> {
        for (a, piece) in self.pieces.iter().enumerate() {
            for w in piece.points.windows(2) {
                for (seg, crossing) in spatial::query_crossings(&self.tree, w[0], w[1]) {
                    let b = seg.piece;
                    if b <= a || self.same_group(a, b) {
                        continue;
                    }
                    if crossing.points().all(|p| self.shared_endpoint(a, b, p)) {
                        continue;
                    }
                    return Err(Rejection::CenterlineCrossing);
                }
            }
        }
        Ok(())
    }

    /// Non-adjacent segments of one piece must not touch.
    pub fn check_self_crossings(&self) -> Result<(), Rejection> {
        for (a, piece) in self.pieces.iter().enumerate() {
            let last = piece.points.len().saturating_sub(2);
            let closed = piece.points.len() > 2 && piece.points.first() == piece.points.last();
            for (i, w) in piece.points.windows(2).enumerate() {
                for (seg, _) in spatial::query_crossings(&self.tree, w[0], w[1]) {
                    if seg.piece != a || seg.index <= i + 1 {
                        continue;
                    }
                    if closed && i == 0 && seg.index == last {
                        continue;
                    }
                    return Err(Rejection::SelfCrossing);
                }
            }
        }
        Ok(())
    }

    /// Every network-wide check.
    pub fn validate(&self) -> Result<(), Rejection> {
        self.check_self_crossings()?;
        self.check_centerlines()?;
        self.check_corridors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(from: Point, to: Point, samples: usize, width: f64) -> InterpolatedPiece {
        InterpolatedPiece {
            points: crate::spline::b_spline(&[from, to], samples, 2),
            width,
        }
    }

    #[test]
    fn width_lines_are_perpendicular_and_sized() {
        let piece = straight([0.0, 0.0], [10.0, 0.0], 3, 8.0);
        let lines = width_lines(&piece, 1.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ([0.0, 4.0], [0.0, -4.0]));
        assert_eq!(lines[2], ([10.0, 4.0], [10.0, -4.0]));
    }

    #[test]
    fn crossing_roads_are_rejected() {
        let net = NetworkGeometry::new(
            vec![
                straight([0.0, 0.0], [40.0, 0.0], 20, 8.0),
                straight([20.0, -20.0], [20.0, 20.0], 20, 8.0),
            ],
            &[],
            1.0,
        );
        assert_eq!(net.check_centerlines(), Err(Rejection::CenterlineCrossing));
        assert_eq!(net.validate(), Err(Rejection::CenterlineCrossing));
    }

    #[test]
    fn crossing_inside_one_group_is_allowed() {
        let net = NetworkGeometry::new(
            vec![
                straight([0.0, 0.0], [40.0, 0.0], 20, 8.0),
                straight([20.0, -20.0], [20.0, 20.0], 20, 8.0),
            ],
            &[vec![0, 1]],
            1.0,
        );
        assert_eq!(net.validate(), Ok(()));
    }

    #[test]
    fn road_meeting_its_successor_at_a_shared_endpoint_is_valid() {
        let net = NetworkGeometry::new(
            vec![
                straight([0.0, 0.0], [20.0, 0.0], 20, 8.0),
                straight([20.0, 0.0], [40.0, 0.0], 20, 8.0),
            ],
            &[],
            1.0,
        );
        assert_eq!(net.validate(), Ok(()));
    }

    #[test]
    fn parallel_roads_closer_than_their_corridors_overlap() {
        let net = NetworkGeometry::new(
            vec![
                straight([0.0, 0.0], [40.0, 0.0], 20, 8.0),
                straight([0.0, 3.0], [40.0, 3.0], 20, 8.0),
            ],
            &[],
            1.0,
        );
        assert_eq!(net.check_centerlines(), Ok(()));
        assert_eq!(net.check_corridors(), Err(Rejection::CorridorOverlap));
    }

    #[test]
    fn parallel_roads_with_clearance_are_valid() {
        let net = NetworkGeometry::new(
            vec![
                straight([0.0, 0.0], [40.0, 0.0], 20, 8.0),
                straight([0.0, 30.0], [40.0, 30.0], 20, 8.0),
            ],
            &[],
            1.0,
        );
        assert_eq!(net.validate(), Ok(()));
    }

    #[test]
    fn self_crossing_loop_is_rejected() {
        let piece = InterpolatedPiece {
            points: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [5.0, -5.0]],
            width: 1.0,
        };
        let net = NetworkGeometry::new(vec![piece], &[], 1.0);
        assert_eq!(net.check_self_crossings(), Err(Rejection::SelfCrossing));
    }

    #[test]
    fn new_line_ignores_its_origin() {
        let net = NetworkGeometry::new(vec![straight([0.0, 0.0], [20.0, 0.0], 10, 8.0)], &[], 1.0);
        assert_eq!(
            net.check_new_line([20.0, 0.0], [30.0, 10.0], 0, &[[20.0, 0.0]], |_| false),
            Ok(())
        );
        assert_eq!(
            net.check_new_line([10.0, -5.0], [10.0, 5.0], 0, &[], |_| false),
            Err(Rejection::CenterlineCrossing)
        );
        assert_eq!(net.check_new_line([10.0, -5.0], [10.0, 5.0], 1, &[], |_| false), Ok(()));
    }
}
