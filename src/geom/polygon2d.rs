//! Simple polygons on the ground plane or in the view plane.

use crate::geom::EPS;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::{Point2D, orient2d};
use crate::geom::segment::{SegmentIntersection, is_point_on_segment, segment_intersection, segments_cross};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

pub mod boolean;
pub mod triangulate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct Polygon2D {
    pts: Vec<Point2D>,
}

impl Polygon2D {
    /// Creates a polygon from its ring of vertices (no repeated closing vertex needed).
    ///
    /// Consecutive duplicate vertices are removed. Fails if fewer than 3 remain.
    pub fn new(pts: Vec<Point2D>) -> Result<Self> {
        let mut ring: Vec<Point2D> = Vec::with_capacity(pts.len());
        for pt in pts {
            if !pt.x.is_finite() || !pt.y.is_finite() {
                return Err(anyhow!("Polygon vertex is not finite: {pt}"));
            }
            if ring.last().is_none_or(|last| !last.is_close(&pt)) {
                ring.push(pt);
            }
        }
        while ring.len() > 1 && ring[0].is_close(&ring[ring.len() - 1]) {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(anyhow!(
                "Polygon must have at least 3 distinct vertices, found {}",
                ring.len()
            ));
        }
        Ok(Self { pts: ring })
    }

    /// Axis-aligned rectangle with its lower-left corner at (x, y).
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        Self::new(vec![
            Point2D::new(x, y),
            Point2D::new(x + width, y),
            Point2D::new(x + width, y + height),
            Point2D::new(x, y + height),
        ])
    }

    pub fn vertices(&self) -> &[Point2D] {
        &self.pts
    }

    pub fn len(&self) -> usize {
        self.pts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    /// Iterates over the edges, including the closing one.
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        let n = self.pts.len();
        (0..n).map(move |i| (self.pts[i], self.pts[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        0.5 * self.edges().map(|(a, b)| a.cross(&b)).sum::<f64>()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.
    }

    /// Returns a copy with counter-clockwise winding.
    pub fn to_ccw(&self) -> Self {
        if self.signed_area() < 0. {
            Self {
                pts: self.pts.iter().rev().copied().collect(),
            }
        } else {
            self.clone()
        }
    }

    /// True if no corner turns against the winding (collinear corners allowed).
    pub fn is_convex(&self) -> bool {
        let sign = self.signed_area().signum();
        let n = self.pts.len();
        let tol = EPS * self.bounds().width().max(self.bounds().height()).max(1.).powi(2);
        (0..n).all(|i| {
            let turn = orient2d(self.pts[i], self.pts[(i + 1) % n], self.pts[(i + 2) % n]);
            turn * sign >= -tol
        })
    }

    /// True if no two non-adjacent edges cross or touch.
    pub fn is_simple(&self) -> bool {
        let n = self.pts.len();
        for i in 0..n {
            let (a0, a1) = (self.pts[i], self.pts[(i + 1) % n]);
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                let (b0, b1) = (self.pts[j], self.pts[(j + 1) % n]);
                if adjacent {
                    // Adjacent edges may only share their common vertex
                    if matches!(
                        segment_intersection(a0, a1, b0, b1),
                        SegmentIntersection::Collinear(_, _)
                    ) && (a0 - a1).dot(&(b1 - b0)) > 0.
                    {
                        return false;
                    }
                    continue;
                }
                if segment_intersection(a0, a1, b0, b1) != SegmentIntersection::None {
                    return false;
                }
            }
        }
        true
    }

    /// Area-weighted centroid (vertex mean for degenerate rings).
    pub fn centroid(&self) -> Point2D {
        let area = self.signed_area();
        if area.abs() < EPS {
            let n = self.pts.len() as f64;
            let sum = self.pts.iter().fold(Point2D::new(0., 0.), |acc, p| acc + *p);
            return sum * (1. / n);
        }
        let mut cx = 0.;
        let mut cy = 0.;
        for (a, b) in self.edges() {
            let f = a.cross(&b);
            cx += (a.x + b.x) * f;
            cy += (a.y + b.y) * f;
        }
        Point2D::new(cx / (6. * area), cy / (6. * area))
    }

    pub fn bounds(&self) -> BoundingBox2D {
        let mut bbox = BoundingBox2D::new(self.pts[0], self.pts[0]);
        for p in self.pts.iter().skip(1) {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        bbox
    }

    /// Checks if a point lies inside the polygon.
    ///
    /// If `boundary_in` is true, points on the boundary are considered inside.
    pub fn is_point_inside(&self, pt: Point2D, boundary_in: bool) -> bool {
        if !self.bounds().contains(pt) {
            return false;
        }
        if self.edges().any(|(a, b)| is_point_on_segment(pt, a, b)) {
            return boundary_in;
        }
        // Crossing number
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > pt.y) != (b.y > pt.y) {
                let x_cross = a.x + (pt.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if pt.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Checks if segment a->b touches or enters the polygon.
    pub fn intersects_segment(&self, a: Point2D, b: Point2D) -> bool {
        if self.is_point_inside(a, true) || self.is_point_inside(b, true) {
            return true;
        }
        self.edges()
            .any(|(e0, e1)| segment_intersection(a, b, e0, e1) != SegmentIntersection::None)
    }

    /// Checks if two polygons overlap or touch.
    pub fn intersects_polygon(&self, other: &Self) -> bool {
        if !self.bounds().overlaps(&other.bounds()) {
            return false;
        }
        if other.pts.iter().any(|p| self.is_point_inside(*p, true))
            || self.pts.iter().any(|p| other.is_point_inside(*p, true))
        {
            return true;
        }
        self.edges().any(|(a0, a1)| {
            other
                .edges()
                .any(|(b0, b1)| segment_intersection(a0, a1, b0, b1) != SegmentIntersection::None)
        })
    }

    /// Distance from a point to the polygon (zero when inside).
    pub fn distance_to(&self, pt: Point2D) -> f64 {
        if self.is_point_inside(pt, true) {
            return 0.;
        }
        self.edges()
            .map(|(a, b)| {
                let ab = b - a;
                let len_sq = ab.dot(&ab);
                let t = if len_sq < EPS {
                    0.
                } else {
                    ((pt - a).dot(&ab) / len_sq).clamp(0., 1.)
                };
                (a + ab * t).distance(&pt)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Convex hull of a point set (Andrew's monotone chain), counter-clockwise.
    pub fn convex_hull(points: &[Point2D]) -> Result<Self> {
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup_by(|a, b| a.is_close(b));
        if pts.len() < 3 {
            return Err(anyhow!("Convex hull needs at least 3 distinct points"));
        }

        let mut lower: Vec<Point2D> = Vec::new();
        for p in pts.iter() {
            while lower.len() >= 2 && orient2d(lower[lower.len() - 2], lower[lower.len() - 1], *p) <= 0. {
                lower.pop();
            }
            lower.push(*p);
        }
        let mut upper: Vec<Point2D> = Vec::new();
        for p in pts.iter().rev() {
            while upper.len() >= 2 && orient2d(upper[upper.len() - 2], upper[upper.len() - 1], *p) <= 0. {
                upper.pop();
            }
            upper.push(*p);
        }
        lower.pop();
        upper.pop();
        lower.extend(upper);

        let hull = Self::new(lower)?;
        if hull.area() < EPS {
            return Err(anyhow!("Convex hull is degenerate (collinear points)"));
        }
        Ok(hull)
    }

    /// Part of the polygon inside a convex polygon (Sutherland-Hodgman).
    ///
    /// The boundary of `convex` counts as inside. Returns `None` when less than
    /// a non-degenerate polygon remains.
    pub fn clip_to_convex(&self, convex: &Polygon2D) -> Option<Polygon2D> {
        let clip = convex.to_ccw();
        let mut output = self.pts.clone();
        for (e0, e1) in clip.edges() {
            if output.is_empty() {
                return None;
            }
            let tol = 1e-9 * (e1 - e0).length();
            let input = std::mem::take(&mut output);
            for j in 0..input.len() {
                let current = input[j];
                let previous = input[(j + input.len() - 1) % input.len()];
                let d_curr = orient2d(e0, e1, current);
                let d_prev = orient2d(e0, e1, previous);
                let curr_inside = d_curr >= -tol;
                let prev_inside = d_prev >= -tol;
                if curr_inside != prev_inside {
                    let t = d_prev / (d_prev - d_curr);
                    output.push(previous.lerp(&current, t));
                }
                if curr_inside {
                    output.push(current);
                }
            }
        }
        let clipped = Self::new(output).ok()?;
        if clipped.area() < EPS {
            return None;
        }
        Some(clipped)
    }

    /// Edges facing `viewer` that it can see.
    ///
    /// An edge is viewable when the viewer lies strictly on its outer side and
    /// the sightline to the edge midpoint does not cross another edge.
    pub fn viewable_edges(&self, viewer: Point2D) -> Vec<(Point2D, Point2D)> {
        let ccw = self.to_ccw();
        let edges: Vec<(Point2D, Point2D)> = ccw.edges().collect();
        edges
            .iter()
            .enumerate()
            .filter(|(_, (a, b))| {
                let tol = EPS * (*b - *a).length().max(1.);
                orient2d(*a, *b, viewer) < -tol
            })
            .filter(|(i, (a, b))| {
                let mid = a.lerp(b, 0.5);
                !edges
                    .iter()
                    .enumerate()
                    .any(|(j, (c, d))| j != *i && segments_cross(viewer, mid, *c, *d))
            })
            .map(|(_, edge)| *edge)
            .collect()
    }
}

impl TryFrom<Vec<Point2D>> for Polygon2D {
    type Error = anyhow::Error;
    fn try_from(pts: Vec<Point2D>) -> Result<Self> {
        Self::new(pts)
    }
}

impl From<Polygon2D> for Vec<Point2D> {
    fn from(poly: Polygon2D) -> Self {
        poly.pts
    }
}
