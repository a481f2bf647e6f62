use crate::Point;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::polygon2d::Polygon2D;
use crate::scene::Token;
use crate::uid::UID;
use anyhow::{Result, bail};

/// Token whose visibility is measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub footprint: Polygon2D,
    /// Footprint cut down by walls or lighting; bounds the visible numerator.
    pub constrained_shape: Option<Polygon2D>,
    pub bottom_z: f64,
    pub top_z: f64,
    /// Token the target belongs to; never treated as an occluder.
    pub uid: Option<UID>,
}

impl Target {
    pub fn new(footprint: Polygon2D, bottom_z: f64, top_z: f64) -> Result<Self> {
        if !(bottom_z <= top_z) {
            bail!("Target bottom {bottom_z} is above its top {top_z}");
        }
        Ok(Self {
            footprint,
            constrained_shape: None,
            bottom_z,
            top_z,
            uid: None,
        })
    }

    pub fn from_token(token: &Token) -> Result<Self> {
        let mut target = Self::new(token.footprint.clone(), token.bottom_z, token.top_z)?;
        target.constrained_shape = token.constrained_shape.clone();
        target.uid = Some(token.uid.clone());
        Ok(target)
    }

    pub fn with_constrained_shape(mut self, shape: Polygon2D) -> Self {
        self.constrained_shape = Some(shape);
        self
    }

    pub fn footprint(&self) -> &Polygon2D {
        &self.footprint
    }

    /// Shape used for the visible numerator.
    pub fn visible_shape(&self) -> &Polygon2D {
        self.constrained_shape.as_ref().unwrap_or(&self.footprint)
    }

    /// Footprint centroid at mid-height.
    pub fn center(&self) -> Point {
        Point::from_2d(self.footprint.centroid(), 0.5 * (self.bottom_z + self.top_z))
    }

    pub fn height(&self) -> f64 {
        self.top_z - self.bottom_z
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.footprint.bounds()
    }

    /// Footprint vertices at the bottom and at the top elevation.
    pub fn corners(&self) -> Vec<Point> {
        let verts = self.footprint.vertices();
        verts
            .iter()
            .map(|v| Point::from_2d(*v, self.bottom_z))
            .chain(verts.iter().map(|v| Point::from_2d(*v, self.top_z)))
            .collect()
    }

    /// Checks whether the footprint contains the point's XY position (boundary included).
    ///
    /// Elevation is ignored.
    pub fn contains(&self, pt: Point) -> bool {
        self.footprint.is_point_inside(pt.to_2d(), true)
    }

    /// True if the footprint spans more than one grid cell in either direction.
    pub fn is_large(&self, grid_size: f64) -> bool {
        let bounds = self.bounds();
        let tol = 1e-6 * grid_size;
        bounds.width() > grid_size + tol || bounds.height() > grid_size + tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target::new(Polygon2D::rectangle(250., -50., 100., 100.).unwrap(), 0., 100.).unwrap()
    }

    #[test]
    fn test_center_and_corners() {
        let t = target();
        assert!(t.center().is_close(&Point::new(300., 0., 50.)));
        assert_eq!(t.corners().len(), 8);
        assert_eq!(t.height(), 100.);
    }

    #[test]
    fn test_contains() {
        let t = target();
        assert!(t.contains(Point::new(300., 0., 50.)));
        assert!(t.contains(Point::new(250., 0., 100.)));
        assert!(t.contains(Point::new(300., 0., 400.)));
        assert!(!t.contains(Point::new(0., 0., 50.)));
    }

    #[test]
    fn test_is_large() -> Result<()> {
        assert!(!target().is_large(100.));
        let big = Target::new(Polygon2D::rectangle(0., 0., 200., 200.)?, 0., 100.)?;
        assert!(big.is_large(100.));
        Ok(())
    }

    #[test]
    fn test_visible_shape_and_validation() -> Result<()> {
        let half = Polygon2D::rectangle(250., -50., 50., 100.)?;
        let t = target().with_constrained_shape(half.clone());
        assert_eq!(t.visible_shape(), &half);
        assert_eq!(target().visible_shape(), target().footprint());
        assert!(Target::new(half, 10., 0.).is_err());
        Ok(())
    }
}
