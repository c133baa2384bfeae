//! 2D vector helpers shared by the generator, the validity oracle and
//! scenario assembly. Points are plain `[f64; 2]`, the same representation
//! the spatial index stores.

pub type Point = [f64; 2];

/// Two crossing points closer than this are the same point.
pub const SAME_POINT_EPS: f64 = 0.01;

pub fn add(a: Point, b: Point) -> Point {
    [a[0] + b[0], a[1] + b[1]]
}

pub fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}

pub fn scale(v: Point, factor: f64) -> Point {
    [v[0] * factor, v[1] * factor]
}

pub fn length(v: Point) -> f64 {
    v[0].hypot(v[1])
}

pub fn distance(a: Point, b: Point) -> f64 {
    length(sub(b, a))
}

pub fn same_point(a: Point, b: Point) -> bool {
    distance(a, b) <= SAME_POINT_EPS
}

/// Unit vector of `v`, or `None` for a zero-length vector.
pub fn normalize(v: Point) -> Option<Point> {
    let len = length(v);
    (len > f64::EPSILON).then(|| scale(v, 1.0 / len))
}

/// Rotate `v` counter-clockwise by `degrees`.
pub fn rotate(v: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [v[0] * cos - v[1] * sin, v[0] * sin + v[1] * cos]
}

/// Rotate `p` counter-clockwise by `degrees` around `origin`.
pub fn rotate_around(p: Point, origin: Point, degrees: f64) -> Point {
    add(origin, rotate(sub(p, origin), degrees))
}

/// Point at `distance` from `from` in the direction of `towards`.
pub fn point_towards(from: Point, towards: Point, distance: f64) -> Option<Point> {
    normalize(sub(towards, from)).map(|dir| add(from, scale(dir, distance)))
}

/// Prolong the segment `from -> to` by `extra` units past `to`.
pub fn extend(from: Point, to: Point, extra: f64) -> Option<Point> {
    let len = distance(from, to);
    (len > f64::EPSILON).then(|| add(from, scale(sub(to, from), (len + extra) / len)))
}

/// Angle at `b` swept from ray `b -> a` to ray `b -> c`, in degrees within
/// `[0, 360)`. 180 means the three points are collinear.
pub fn turn_angle(a: Point, b: Point, c: Point) -> f64 {
    let ang = ((c[1] - b[1]).atan2(c[0] - b[0]) - (a[1] - b[1]).atan2(a[0] - b[0])).to_degrees();
    if ang < 0.0 {
        ang + 360.0
    } else {
        ang
    }
}

/// Heading of `from -> to` in degrees, measured counter-clockwise from +x.
pub fn heading(from: Point, to: Point) -> f64 {
    turn_angle(add(from, [1.0, 0.0]), from, to)
}

pub fn round_to(p: Point, decimals: i32) -> Point {
    let factor = 10f64.powi(decimals);
    [
        (p[0] * factor).round() / factor,
        (p[1] * factor).round() / factor,
    ]
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Crossing {
    Point(Point),
    /// Collinear segments sharing a stretch between the two points.
    Overlap(Point, Point),
}

impl Crossing {
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let (a, b) = match *self {
            Crossing::Point(p) => (p, None),
            Crossing::Overlap(p, q) => (p, Some(q)),
        };
        std::iter::once(a).chain(b)
    }
}

fn cross(a: Point, b: Point) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// Intersection of the closed segments `a0-a1` and `b0-b1`, touching
/// endpoints included.
pub fn segment_crossing(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Crossing> {
    const EPS: f64 = 1e-9;
    let r = sub(a1, a0);
    let s = sub(b1, b0);
    let denom = cross(r, s);
    let qp = sub(b0, a0);

    if denom.abs() <= EPS {
        if cross(qp, r).abs() > EPS {
            return None;
        }
        let rr = dot(r, r);
        if rr <= EPS {
            // `a` is a single point lying on the line through `b`.
            let ss = dot(s, s);
            if ss <= EPS {
                return same_point(a0, b0).then_some(Crossing::Point(a0));
            }
            let t = dot(sub(a0, b0), s) / ss;
            return (-EPS..=1.0 + EPS).contains(&t).then_some(Crossing::Point(a0));
        }
        let t0 = dot(qp, r) / rr;
        let t1 = t0 + dot(s, r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let lo = lo.max(0.0);
        let hi = hi.min(1.0);
        if lo > hi + EPS {
            return None;
        }
        let p = add(a0, scale(r, lo));
        let q = add(a0, scale(r, hi));
        return Some(if same_point(p, q) {
            Crossing::Point(p)
        } else {
            Crossing::Overlap(p, q)
        });
    }

    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
        Some(Crossing::Point(add(a0, scale(r, t))))
    } else {
        None
    }
}

/// Shortest distance from `p` to the segment `a-b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = sub(b, a);
    let len_sq = dot(ab, ab);
    if len_sq <= f64::EPSILON {
        return distance(p, a);
    }
    let t = (dot(sub(p, a), ab) / len_sq).clamp(0.0, 1.0);
    distance(p, add(a, scale(ab, t)))
}

pub fn point_polyline_distance(p: Point, line: &[Point]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => distance(p, *only),
        _ => line
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Offset a polyline sideways by a fixed distance, keeping its orientation.
/// Positive offset = left of the travel direction, negative = right.
pub fn offset_polyline(line: &[Point], offset: f64) -> Vec<Point> {
    if line.len() < 2 {
        return line.to_vec();
    }
    let mut result = Vec::with_capacity(line.len());
    for i in 0..line.len() {
        let dir = if i + 1 < line.len() {
            sub(line[i + 1], line[i])
        } else {
            sub(line[i], line[i - 1])
        };
        // Repeated samples carry no direction; fall back to the previous one.
        let dir = normalize(dir)
            .or_else(|| (i > 0).then(|| sub(line[i], line[i - 1])).and_then(normalize))
            .unwrap_or([1.0, 0.0]);
        let normal = [-dir[1], dir[0]];
        result.push(add(line[i], scale(normal, offset)));
    }
    result
}

/// First crossing of two polylines, walking `a` from its start. Returns the
/// point and the indices of the crossing segments in `a` and `b`.
pub fn polyline_crossing(a: &[Point], b: &[Point]) -> Option<(Point, usize, usize)> {
    for (i, sa) in a.windows(2).enumerate() {
        for (j, sb) in b.windows(2).enumerate() {
            if let Some(crossing) = segment_crossing(sa[0], sa[1], sb[0], sb[1]) {
                return crossing.points().next().map(|p| (p, i, j));
            }
        }
    }
    None
}

/// Total length of a polyline.
pub fn polyline_length(line: &[Point]) -> f64 {
    line.windows(2).map(|w| distance(w[0], w[1])).sum()
}
