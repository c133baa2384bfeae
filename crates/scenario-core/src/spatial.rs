use rstar::primitives::{GeomWithData, Line};
use rstar::{RTree, AABB};

use crate::geometry::{segment_crossing, Crossing, Point};

/// Which interpolated piece a segment belongs to, and its position along it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentRef {
    pub piece: usize,
    pub index: usize,
}

pub type IndexedSegment = GeomWithData<Line<Point>, SegmentRef>;

/// Build an R*-tree over every consecutive sample pair of every polyline via
/// bulk_load (O(n log n)).
pub fn build_index<'a>(polylines: impl IntoIterator<Item = (usize, &'a [Point])>) -> RTree<IndexedSegment> {
    let segments = polylines
        .into_iter()
        .flat_map(|(piece, points)| {
            points.windows(2).enumerate().map(move |(index, w)| {
                GeomWithData::new(Line::new(w[0], w[1]), SegmentRef { piece, index })
            })
        })
        .collect();
    RTree::bulk_load(segments)
}

/// Query every indexed segment crossing `a-b`.
/// Uses an AABB envelope query then filters by exact segment intersection.
pub fn query_crossings(
    tree: &RTree<IndexedSegment>,
    a: Point,
    b: Point,
) -> impl Iterator<Item = (SegmentRef, Crossing)> + '_ {
    let envelope = AABB::from_corners(
        [a[0].min(b[0]), a[1].min(b[1])],
        [a[0].max(b[0]), a[1].max(b[1])],
    );
    tree.locate_in_envelope_intersecting(&envelope)
        .filter_map(move |seg| {
            let line = seg.geom();
            segment_crossing(a, b, line.from, line.to).map(|c| (seg.data, c))
        })
}
