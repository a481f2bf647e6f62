//! Line segment operations on the plane.
//!
//! This module provides intersection tests between segments and the clipping
//! of a segment against a convex polygon.

use crate::geom::EPS;
use crate::geom::point2d::{Point2D, orient2d};

/// Result of a line segment intersection test.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentIntersection {
    /// Segments intersect at a single point
    Point(Point2D),
    /// Segments are collinear and overlap (returns the overlap segment)
    Collinear(Point2D, Point2D),
    /// No intersection (parallel, or segments don't reach each other)
    None,
}

/// Finds the intersection of segments p1->p2 and p3->p4.
///
/// Endpoints touching the other segment count as an intersection.
pub fn segment_intersection(
    p1: Point2D,
    p2: Point2D,
    p3: Point2D,
    p4: Point2D,
) -> SegmentIntersection {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let r = p3 - p1;
    let denom = d1.cross(&d2);
    let scale = d1.length() * d2.length();

    if scale < EPS {
        // At least one segment is a point
        if d1.length() < EPS && is_point_on_segment(p1, p3, p4) {
            return SegmentIntersection::Point(p1);
        }
        if d2.length() < EPS && is_point_on_segment(p3, p1, p2) {
            return SegmentIntersection::Point(p3);
        }
        return SegmentIntersection::None;
    }

    if denom.abs() < EPS * scale {
        // Parallel segments - check if collinear
        if r.cross(&d1).abs() > EPS * d1.length().max(1.) {
            return SegmentIntersection::None;
        }
        let len_sq = d1.dot(&d1);
        let t0 = r.dot(&d1) / len_sq;
        let t1 = (p4 - p1).dot(&d1) / len_sq;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let lo = lo.max(0.);
        let hi = hi.min(1.);
        if lo > hi + EPS {
            return SegmentIntersection::None;
        }
        let a = p1 + d1 * lo;
        let b = p1 + d1 * hi;
        if a.is_close(&b) {
            return SegmentIntersection::Point(a);
        }
        return SegmentIntersection::Collinear(a, b);
    }

    let t = r.cross(&d2) / denom;
    let s = r.cross(&d1) / denom;
    let tol = 1e-9;
    if (-tol..=1.0 + tol).contains(&t) && (-tol..=1.0 + tol).contains(&s) {
        SegmentIntersection::Point(p1 + d1 * t)
    } else {
        SegmentIntersection::None
    }
}

/// Checks if two segments cross at a point interior to both of them.
///
/// Touching at endpoints or running along each other does not count.
pub fn segments_cross(p1: Point2D, p2: Point2D, p3: Point2D, p4: Point2D) -> bool {
    let tol_a = EPS * (p2 - p1).length().max(1.);
    let tol_b = EPS * (p4 - p3).length().max(1.);
    let o1 = orient2d(p1, p2, p3);
    let o2 = orient2d(p1, p2, p4);
    let o3 = orient2d(p3, p4, p1);
    let o4 = orient2d(p3, p4, p2);
    ((o1 > tol_a && o2 < -tol_a) || (o1 < -tol_a && o2 > tol_a))
        && ((o3 > tol_b && o4 < -tol_b) || (o3 < -tol_b && o4 > tol_b))
}

/// Checks if a point lies on a line segment (within tolerance).
pub fn is_point_on_segment(pt: Point2D, seg_start: Point2D, seg_end: Point2D) -> bool {
    let seg = seg_end - seg_start;
    let len_sq = seg.dot(&seg);
    if len_sq < EPS * EPS {
        return pt.is_close(&seg_start);
    }
    let t = (pt - seg_start).dot(&seg) / len_sq;
    if !(-1e-9..=1.0 + 1e-9).contains(&t) {
        return false;
    }
    let projected = seg_start + seg * t.clamp(0.0, 1.0);
    projected.distance(&pt) < 1e-7 * len_sq.sqrt().max(1.)
}

/// Clips segment a->b to a convex counter-clockwise polygon (Cyrus-Beck).
///
/// The polygon boundary counts as inside. Returns `None` when nothing of
/// positive length remains.
pub fn clip_segment_to_convex(
    a: Point2D,
    b: Point2D,
    convex: &[Point2D],
) -> Option<(Point2D, Point2D)> {
    let d = b - a;
    let mut t_enter: f64 = 0.;
    let mut t_exit: f64 = 1.;
    let n = convex.len();
    if n < 3 {
        return None;
    }

    for i in 0..n {
        let e0 = convex[i];
        let e1 = convex[(i + 1) % n];
        let edge = e1 - e0;
        let tol = EPS * edge.length().max(1.);
        // Signed distance-like value; >= 0 is inside for CCW polygons
        let num = edge.cross(&(a - e0));
        let den = edge.cross(&d);
        if den.abs() < EPS {
            if num < -tol {
                return None; // Parallel and outside
            }
            continue;
        }
        let t = -num / den;
        if den > 0. {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    let p0 = a + d * t_enter;
    let p1 = a + d * t_exit;
    if p0.distance(&p1) < EPS {
        return None;
    }
    Some((p0, p1))
}
