//! Viewer-centred perspective projection.
//!
//! World coordinates have `z` as elevation. The camera follows the OpenGL
//! convention: it looks down its own -z axis, and the perspective matrix maps the
//! view frustum to normalized device coordinates.

use crate::Point;
use crate::Vector;
use crate::geom::EPS;
use crate::geom::point2d::Point2D;
use anyhow::{Result, bail};
use log::warn;
use ndarray as nd;

/// Near clipping distance used for target-aimed transforms.
pub const DEFAULT_NEAR: f64 = 0.1;

/// Far clipping distance; only depth ordering inside the frustum depends on it.
pub const DEFAULT_FAR: f64 = 1e7;

/// Margin added to the field of view so that target edges never sit on the frustum boundary.
const FOV_MARGIN_DEG: f64 = 1.;

/// Upper limit of the field of view.
const MAX_FOV_DEG: f64 = 179.;

/// Look-at and perspective matrices for one (viewer, aim point) pair.
#[derive(Debug, Clone)]
pub struct ViewTransform {
    pub look_at: nd::Array2<f64>,
    pub perspective: nd::Array2<f64>,
    view_proj: nd::Array2<f64>,
    eye: Point,
    right: Vector,
    up: Vector,
    forward: Vector,
    near: f64,
    focal: f64,
    aspect: f64,
}

/// Camera basis (right, up, forward) looking from `eye` toward `aim`.
fn camera_basis(eye: Point, aim: Point, up: Vector) -> (Vector, Vector, Vector) {
    let forward = match (aim - eye).normalize() {
        Ok(f) => f,
        Err(_) => {
            warn!("Viewer and aim point coincide at {eye}, looking along +x");
            Vector::new(1., 0., 0.)
        }
    };
    let right = forward
        .cross(&up)
        .normalize()
        // Forward parallel to `up`
        .or_else(|_| forward.cross(&Vector::new(0., 1., 0.)).normalize())
        .unwrap_or(Vector::new(0., 1., 0.));
    let cam_up = right.cross(&forward);
    (right, cam_up, forward)
}

/// Builds the look-at matrix mapping world points into camera space.
pub fn look_at_matrix(eye: Point, aim: Point, up: Vector) -> nd::Array2<f64> {
    let (s, u, f) = camera_basis(eye, aim, up);
    basis_matrix(eye, s, u, f)
}

fn basis_matrix(eye: Point, s: Vector, u: Vector, f: Vector) -> nd::Array2<f64> {
    let e = Vector::from_a_point(eye);
    nd::arr2(&[
        [s.dx, s.dy, s.dz, -s.dot(&e)],
        [u.dx, u.dy, u.dz, -u.dot(&e)],
        [-f.dx, -f.dy, -f.dz, f.dot(&e)],
        [0., 0., 0., 1.],
    ])
}

/// Builds an OpenGL-style perspective matrix.
///
/// Requires `0 < near < far` and `0 < fov < π`.
pub fn perspective_matrix(fov_rad: f64, aspect: f64, near: f64, far: f64) -> Result<nd::Array2<f64>> {
    if near <= 0. || near >= far {
        bail!("Perspective requires 0 < near < far (near={near}, far={far})");
    }
    if fov_rad <= 0. || fov_rad >= std::f64::consts::PI {
        bail!("Perspective field of view must be in (0, π), got {fov_rad}");
    }
    if aspect <= 0. {
        bail!("Perspective aspect ratio must be positive, got {aspect}");
    }
    let f = 1. / (fov_rad / 2.).tan();
    Ok(nd::arr2(&[
        [f / aspect, 0., 0., 0.],
        [0., f, 0., 0.],
        [0., 0., (far + near) / (near - far), 2. * far * near / (near - far)],
        [0., 0., -1., 0.],
    ]))
}

impl ViewTransform {
    /// Creates a transform from explicit camera parameters.
    pub fn new(eye: Point, aim: Point, fov_rad: f64, near: f64, far: f64) -> Result<Self> {
        let (right, up, forward) = camera_basis(eye, aim, Vector::new(0., 0., 1.));
        let look_at = basis_matrix(eye, right, up, forward);
        let perspective = perspective_matrix(fov_rad, 1., near, far)?;
        let view_proj = perspective.dot(&look_at);
        Ok(Self {
            look_at,
            perspective,
            view_proj,
            eye,
            right,
            up,
            forward,
            near,
            focal: 1. / (fov_rad / 2.).tan(),
            aspect: 1.,
        })
    }

    /// Aims at `aim` with a field of view wide enough to contain every corner.
    ///
    /// The field of view is twice the largest angle between the aim direction and
    /// a corner, plus a small margin, capped below 180°.
    pub fn for_target(eye: Point, aim: Point, corners: &[Point]) -> Result<Self> {
        let aim_dir = aim - eye;
        let max_angle = corners
            .iter()
            .map(|c| aim_dir.angle(&(*c - eye)).unwrap_or(std::f64::consts::FRAC_PI_2))
            .fold(0., f64::max);
        let fov = (2. * max_angle + FOV_MARGIN_DEG.to_radians()).min(MAX_FOV_DEG.to_radians());
        Self::new(eye, aim, fov, DEFAULT_NEAR, DEFAULT_FAR)
    }

    pub fn eye(&self) -> Point {
        self.eye
    }

    pub fn near(&self) -> f64 {
        self.near
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vector {
        self.forward
    }

    /// Distance of a point in front of the camera, measured along the view axis.
    pub fn depth(&self, pt: Point) -> f64 {
        (pt - self.eye).dot(&self.forward)
    }

    /// Projects a world point to normalized device coordinates.
    ///
    /// Returns `None` for points behind the near plane.
    pub fn project(&self, pt: Point) -> Option<Point2D> {
        let h = self.view_proj.dot(&nd::arr1(&[pt.x, pt.y, pt.z, 1.]));
        let w = h[3];
        if w < self.near - EPS * self.near.max(1.) {
            return None;
        }
        Some(Point2D::new(h[0] / w, h[1] / w))
    }

    /// Projects every vertex; fails as a whole if any vertex is behind the near plane.
    pub fn project_polygon(&self, pts: &[Point]) -> Option<Vec<Point2D>> {
        pts.iter().map(|p| self.project(*p)).collect()
    }

    /// World direction of the pixel ray through `ndc`, scaled to unit depth.
    pub fn ray_through(&self, ndc: Point2D) -> Vector {
        let dx = ndc.x * self.aspect / self.focal;
        let dy = ndc.y / self.focal;
        self.right * dx + self.up * dy + self.forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aim_point_projects_to_origin() -> Result<()> {
        let vt = ViewTransform::new(
            Point::new(0., 0., 0.),
            Point::new(300., 0., 50.),
            60f64.to_radians(),
            0.1,
            1e4,
        )?;
        let p = vt.project(Point::new(300., 0., 50.)).unwrap();
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_orientation() -> Result<()> {
        let vt = ViewTransform::new(
            Point::new(0., 0., 0.),
            Point::new(100., 0., 0.),
            90f64.to_radians(),
            0.1,
            1e4,
        )?;
        // Looking along +x with z up: +y is to the left, +z is up
        let left = vt.project(Point::new(100., 10., 0.)).unwrap();
        let up = vt.project(Point::new(100., 0., 10.)).unwrap();
        assert!(left.x < 0.);
        assert!(up.y > 0.);
        // At 90° fov the frustum edge sits at 45°
        let edge = vt.project(Point::new(100., -100., 0.)).unwrap();
        assert!((edge.x - 1.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_behind_camera_is_none() -> Result<()> {
        let vt = ViewTransform::new(
            Point::new(0., 0., 0.),
            Point::new(100., 0., 0.),
            60f64.to_radians(),
            0.1,
            1e4,
        )?;
        assert!(vt.project(Point::new(-10., 0., 0.)).is_none());
        assert!(vt.project(Point::new(0.05, 0., 0.)).is_none());
        assert!((vt.depth(Point::new(42., 7., -3.)) - 42.).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_look_at_matrix_moves_eye_to_origin() {
        let eye = Point::new(10., -5., 2.);
        let m = look_at_matrix(eye, Point::new(20., 0., 2.), Vector::new(0., 0., 1.));
        let h = m.dot(&nd::arr1(&[eye.x, eye.y, eye.z, 1.]));
        assert!(h[0].abs() < 1e-9 && h[1].abs() < 1e-9 && h[2].abs() < 1e-9);
    }

    #[test]
    fn test_perspective_validation() {
        assert!(perspective_matrix(1., 1., 0., 10.).is_err());
        assert!(perspective_matrix(1., 1., 10., 1.).is_err());
        assert!(perspective_matrix(std::f64::consts::PI, 1., 0.1, 10.).is_err());
        assert!(perspective_matrix(1., 1., 0.1, 10.).is_ok());
    }

    #[test]
    fn test_degenerate_look_at() -> Result<()> {
        let eye = Point::new(1., 2., 3.);
        let vt = ViewTransform::new(eye, eye, 1., 0.1, 100.)?;
        assert!(vt.forward().is_close(&Vector::new(1., 0., 0.)));

        // Straight down: forward parallel to world up
        let vt = ViewTransform::new(eye, Point::new(1., 2., -10.), 1., 0.1, 100.)?;
        assert!(vt.project(Point::new(1., 2., -5.)).is_some());
        Ok(())
    }

    #[test]
    fn test_for_target_contains_corners() -> Result<()> {
        let corners = [
            Point::new(250., -50., 0.),
            Point::new(350., -50., 0.),
            Point::new(350., 50., 100.),
            Point::new(250., 50., 100.),
        ];
        let vt = ViewTransform::for_target(Point::new(0., 0., 0.), Point::new(300., 0., 50.), &corners)?;
        for c in corners {
            let p = vt.project(c).unwrap();
            assert!(p.x.abs() < 1. && p.y.abs() < 1.);
        }
        Ok(())
    }

    #[test]
    fn test_ray_through_hits_projected_point() -> Result<()> {
        let vt = ViewTransform::new(
            Point::new(0., 0., 0.),
            Point::new(100., 20., 10.),
            1.,
            0.1,
            1e4,
        )?;
        let pt = Point::new(120., 5., 30.);
        let ndc = vt.project(pt).unwrap();
        let dir = vt.ray_through(ndc);
        let depth = vt.depth(pt);
        let back = vt.eye() + dir * depth;
        assert!(back.distance(&pt) < 1e-6);
        Ok(())
    }
}
