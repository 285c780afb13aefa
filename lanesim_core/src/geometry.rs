//! Planar geometry: polylines with arc length, polygons and agent shapes.
//!
//! Coordinates are metres in the map frame. Angles are radians, measured
//! counter-clockwise from the +x axis.

use geo::{BoundingRect, Coord, Intersects, LineString, MapCoords, Point, Polygon};
use std::f64::consts::PI;

/// A point in the map frame.
pub type Point2d = Coord<f64>;

/// Shorthand constructor for [`Point2d`].
pub fn point(x: f64, y: f64) -> Point2d {
    Coord { x, y }
}

/// Euclidean distance between two points.
pub fn distance(a: Point2d, b: Point2d) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Smallest signed rotation taking `b` onto `a`.
pub fn signed_angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}

/// A polyline parameterised by arc length `s`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    points: Vec<Point2d>,
    /// Cumulative arc length at each point; `s[0] == 0`
    s: Vec<f64>,
}

impl Line {
    /// Creates a line, dropping consecutive duplicate points.
    pub fn new(points: Vec<Point2d>) -> Self {
        let mut line = Self::default();
        for p in points {
            line.push(p);
        }
        line
    }

    fn push(&mut self, p: Point2d) {
        match self.points.last() {
            None => {
                self.points.push(p);
                self.s.push(0.0);
            }
            Some(&last) => {
                let d = distance(last, p);
                if d > 1e-9 {
                    let s_last = self.s.last().copied().unwrap_or(0.0);
                    self.points.push(p);
                    self.s.push(s_last + d);
                }
            }
        }
    }

    /// Appends `other`, skipping its first point when it coincides with our last.
    pub fn append(&mut self, other: &Line) {
        for &p in &other.points {
            self.push(p);
        }
    }

    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total arc length.
    pub fn length(&self) -> f64 {
        self.s.last().copied().unwrap_or(0.0)
    }

    /// Projects `p` onto the line, returning the closest point and its arc length.
    pub fn nearest_point_and_s(&self, p: Point2d) -> (Point2d, f64) {
        match self.points.len() {
            0 => return (p, 0.0),
            1 => return (self.points[0], 0.0),
            _ => {}
        }

        let mut best = (self.points[0], 0.0);
        let mut best_dist = f64::INFINITY;

        for (i, seg) in self.points.windows(2).enumerate() {
            let (a, b) = (seg[0], seg[1]);
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let len_sq = dx * dx + dy * dy;
            let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
            let proj = point(a.x + t * dx, a.y + t * dy);
            let d = distance(proj, p);
            if d < best_dist {
                best_dist = d;
                best = (proj, self.s[i] + t * len_sq.sqrt());
            }
        }

        best
    }

    /// Distance from `p` to the closest point of the line.
    pub fn distance(&self, p: Point2d) -> f64 {
        distance(self.nearest_point_and_s(p).0, p)
    }

    /// Index of the segment that contains arc length `s` (clamped).
    fn segment_at(&self, s: f64) -> usize {
        let idx = self.s.partition_point(|&si| si <= s);
        idx.saturating_sub(1).min(self.points.len().saturating_sub(2))
    }

    /// Point at arc length `s`, clamped to the line's extent.
    pub fn point_at_s(&self, s: f64) -> Point2d {
        match self.points.len() {
            0 => return point(0.0, 0.0),
            1 => return self.points[0],
            _ => {}
        }
        let s = s.clamp(0.0, self.length());
        let i = self.segment_at(s);
        let (a, b) = (self.points[i], self.points[i + 1]);
        let seg_len = self.s[i + 1] - self.s[i];
        let t = if seg_len > 0.0 { (s - self.s[i]) / seg_len } else { 0.0 };
        point(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
    }

    /// Heading of the segment at arc length `s`.
    pub fn angle_at_s(&self, s: f64) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let i = self.segment_at(s.clamp(0.0, self.length()));
        let (a, b) = (self.points[i], self.points[i + 1]);
        (b.y - a.y).atan2(b.x - a.x)
    }

    /// Parallel line offset to the left by `d` (negative offsets go right).
    ///
    /// Vertex normals are averaged from adjacent segments, which is accurate
    /// enough for the gentle curvature of lane center lines.
    pub fn offset(&self, d: f64) -> Line {
        let n = self.points.len();
        if n < 2 {
            return self.clone();
        }

        let normal = |a: Point2d, b: Point2d| {
            let len = distance(a, b);
            point(-(b.y - a.y) / len, (b.x - a.x) / len)
        };

        let shifted = (0..n)
            .map(|i| {
                let nrm = if i == 0 {
                    normal(self.points[0], self.points[1])
                } else if i == n - 1 {
                    normal(self.points[n - 2], self.points[n - 1])
                } else {
                    let n1 = normal(self.points[i - 1], self.points[i]);
                    let n2 = normal(self.points[i], self.points[i + 1]);
                    let avg = point(n1.x + n2.x, n1.y + n2.y);
                    let len = avg.x.hypot(avg.y);
                    if len < 1e-9 { n1 } else { point(avg.x / len, avg.y / len) }
                };
                point(self.points[i].x + d * nrm.x, self.points[i].y + d * nrm.y)
            })
            .collect();

        Line::new(shifted)
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(self.points.clone())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2d,
    pub max: Point2d,
}

impl BoundingBox {
    /// Smallest box containing both.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: point(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: point(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Box grown by `margin` on every side.
    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min: point(self.min.x - margin, self.min.y - margin),
            max: point(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Simple polygon in the map frame (or the body frame for agent shapes).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2d(pub Polygon<f64>);

impl Polygon2d {
    /// Creates a polygon from its exterior ring; the ring is closed automatically.
    pub fn from_points(points: Vec<Point2d>) -> Self {
        Self(Polygon::new(LineString::new(points), vec![]))
    }

    /// Builds the polygon enclosed between a left and a right boundary.
    pub fn from_boundaries(left: &Line, right: &Line) -> Self {
        let mut ring: Vec<Point2d> = left.points().to_vec();
        ring.extend(right.points().iter().rev());
        Self::from_points(ring)
    }

    pub fn intersects(&self, other: &Polygon2d) -> bool {
        self.0.intersects(&other.0)
    }

    /// True when `p` lies inside or on the boundary.
    pub fn contains_point(&self, p: Point2d) -> bool {
        self.0.intersects(&Point::from(p))
    }

    /// Rotates about the origin by `theta`, then translates by `(x, y)`.
    pub fn transform(&self, x: f64, y: f64, theta: f64) -> Polygon2d {
        let (sin, cos) = theta.sin_cos();
        Polygon2d(self.0.map_coords(|c| Coord {
            x: c.x * cos - c.y * sin + x,
            y: c.x * sin + c.y * cos + y,
        }))
    }

    pub fn exterior(&self) -> &[Point2d] {
        &self.0.exterior().0
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.0.bounding_rect().map(|rect| BoundingBox {
            min: rect.min(),
            max: rect.max(),
        })
    }
}

/// Polygons for common agent footprints, in the body frame.
pub mod standard_shapes {
    use super::{point, Polygon2d};

    /// Distance from the reference point to the front bumper.
    pub const CAR_FRONT: f64 = 3.5;

    /// Distance from the reference point to the rear bumper.
    pub const CAR_REAR: f64 = 1.0;

    /// Half the vehicle width.
    pub const CAR_HALF_WIDTH: f64 = 0.9;

    /// A 4.5 m x 1.8 m passenger car, reference point on the rear axle.
    pub fn car_limousine() -> Polygon2d {
        Polygon2d::from_points(vec![
            point(-CAR_REAR, -CAR_HALF_WIDTH),
            point(CAR_FRONT, -CAR_HALF_WIDTH),
            point(CAR_FRONT, CAR_HALF_WIDTH),
            point(-CAR_REAR, CAR_HALF_WIDTH),
        ])
    }
}
