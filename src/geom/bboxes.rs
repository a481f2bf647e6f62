use crate::geom::EPS;
use crate::geom::point2d::Point2D;

/// Axis-aligned rectangle on the ground plane or in the view plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox2D {
    pub min: Point2D,
    pub max: Point2D,
}

impl BoundingBox2D {
    pub fn new(min: Point2D, max: Point2D) -> Self {
        Self { min, max }
    }

    /// Returns `None` for an empty point set.
    pub fn from_points(pts: &[Point2D]) -> Option<Self> {
        let first = pts.first()?;
        let mut bbox = Self::new(*first, *first);
        for p in pts.iter().skip(1) {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Checks whether two boxes overlap (touching counts).
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max.x < other.min.x - EPS
            || self.min.x > other.max.x + EPS
            || self.max.y < other.min.y - EPS
            || self.min.y > other.max.y + EPS)
    }

    /// Checks whether a point is inside the box (boundary included).
    pub fn contains(&self, pt: Point2D) -> bool {
        pt.x >= self.min.x - EPS
            && pt.x <= self.max.x + EPS
            && pt.y >= self.min.y - EPS
            && pt.y <= self.max.y + EPS
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            Point2D::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2D::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Grows the box by `fraction` of its size on every side.
    pub fn expanded(&self, fraction: f64) -> Self {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Self::new(
            Point2D::new(self.min.x - dx, self.min.y - dy),
            Point2D::new(self.max.x + dx, self.max.y + dy),
        )
    }

    /// Corners in counter-clockwise order.
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.min,
            Point2D::new(self.max.x, self.min.y),
            self.max,
            Point2D::new(self.min.x, self.max.y),
        ]
    }
}
