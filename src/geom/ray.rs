//! Ray casting against planar 3D polygons.

use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::{Point, Vector};

/// A ray defined by an origin point and a direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Unit direction vector
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize().ok()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Creates a ray from two points (origin to target).
    pub fn from_points(origin: Point, target: Point) -> Option<Self> {
        Self::new(origin, target - origin)
    }

    /// Returns the point along the ray at parameter t.
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Calculates the intersection of this ray with a planar polygon.
    ///
    /// Returns `Some((t, point))` for hits in front of the origin (t > 0).
    /// Points on the polygon boundary count as hits.
    pub fn intersect_polygon(&self, pts: &[Point]) -> Option<(f64, Point)> {
        let normal = newell_normal(pts)?;
        let denom = normal.dot(&self.direction);
        if denom.abs() < 1e-10 {
            return None; // Ray parallel to plane
        }

        let t = normal.dot(&(pts[0] - self.origin)) / denom;
        if t < 1e-10 {
            return None;
        }

        let hit = self.point_at(t);
        if is_point_inside_planar(hit, pts, &normal) {
            Some((t, hit))
        } else {
            None
        }
    }
}

/// Unit normal of a planar polygon (Newell's method). `None` for degenerate rings.
pub fn newell_normal(pts: &[Point]) -> Option<Vector> {
    if pts.len() < 3 {
        return None;
    }
    let mut n = Vector::new(0., 0., 0.);
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[(i + 1) % pts.len()];
        n.dx += (a.y - b.y) * (a.z + b.z);
        n.dy += (a.z - b.z) * (a.x + b.x);
        n.dz += (a.x - b.x) * (a.y + b.y);
    }
    n.normalize().ok()
}

/// Point-in-polygon test for a point lying in the polygon's plane.
///
/// The polygon is flattened by dropping the dominant normal axis.
fn is_point_inside_planar(pt: Point, pts: &[Point], normal: &Vector) -> bool {
    let (ax, ay, az) = (normal.dx.abs(), normal.dy.abs(), normal.dz.abs());
    let flatten = |p: &Point| {
        if az >= ax && az >= ay {
            Point2D::new(p.x, p.y)
        } else if ay >= ax {
            Point2D::new(p.x, p.z)
        } else {
            Point2D::new(p.y, p.z)
        }
    };
    match Polygon2D::new(pts.iter().map(flatten).collect()) {
        Ok(poly) => poly.is_point_inside(flatten(&pt), true),
        Err(_) => false,
    }
}

/// Checks whether the open segment a->b passes through a planar polygon.
///
/// Returns the hit point. Hits at the segment endpoints do not count.
pub fn segment_hits_polygon(a: Point, b: Point, pts: &[Point]) -> Option<Point> {
    let len = a.distance(&b);
    let ray = Ray::from_points(a, b)?;
    let (t, hit) = ray.intersect_polygon(pts)?;
    let tol = 1e-9 * len.max(1.);
    if t > tol && t < len - tol { Some(hit) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Vec<Point> {
        vec![
            Point::new(150., -50., -50.),
            Point::new(150., 50., -50.),
            Point::new(150., 50., 150.),
            Point::new(150., -50., 150.),
        ]
    }

    #[test]
    fn test_ray_creation() {
        assert!(Ray::new(Point::new(0., 0., 0.), Vector::new(1., 0., 0.)).is_some());
        // Zero direction should fail
        assert!(Ray::new(Point::new(0., 0., 0.), Vector::new(0., 0., 0.)).is_none());
    }

    #[test]
    fn test_ray_hits_vertical_wall() {
        let ray = Ray::from_points(Point::new(0., 0., 0.), Point::new(300., 0., 50.)).unwrap();
        let (t, hit) = ray.intersect_polygon(&wall()).unwrap();
        assert!(t > 0.);
        assert!((hit.x - 150.).abs() < 1e-9);
        assert!((hit.z - 25.).abs() < 1e-9);
    }

    #[test]
    fn test_ray_misses_and_behind() {
        let ray = Ray::from_points(Point::new(0., 0., 0.), Point::new(300., 200., 0.)).unwrap();
        assert!(ray.intersect_polygon(&wall()).is_none());
        let ray = Ray::from_points(Point::new(0., 0., 0.), Point::new(-300., 0., 0.)).unwrap();
        assert!(ray.intersect_polygon(&wall()).is_none());
    }

    #[test]
    fn test_segment_hits_horizontal_polygon() {
        let tile = vec![
            Point::new(0., 0., 10.),
            Point::new(10., 0., 10.),
            Point::new(10., 10., 10.),
            Point::new(0., 10., 10.),
        ];
        let hit = segment_hits_polygon(Point::new(5., 5., 0.), Point::new(5., 5., 20.), &tile);
        assert!(hit.is_some_and(|p| (p.z - 10.).abs() < 1e-9));
        // Segment ending before the tile
        assert!(segment_hits_polygon(Point::new(5., 5., 0.), Point::new(5., 5., 5.), &tile).is_none());
        // Segment ending exactly on the tile
        assert!(segment_hits_polygon(Point::new(5., 5., 0.), Point::new(5., 5., 10.), &tile).is_none());
    }

    #[test]
    fn test_newell_normal() {
        let n = newell_normal(&wall()).unwrap();
        assert!((n.dx.abs() - 1.).abs() < 1e-12);
        assert!(newell_normal(&wall()[..2]).is_none());
    }
}
