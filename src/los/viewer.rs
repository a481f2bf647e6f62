use crate::Point;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::segment::segments_cross;
use crate::scene::{SenseType, Token};
use crate::uid::UID;
use serde::{Deserialize, Serialize};

/// Tolerance for cone boundary tests, in radians.
const ANGLE_TOL: f64 = 1e-9;

fn default_angle() -> f64 {
    360.
}

/// Vision cone of a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Full opening angle of the cone in degrees; 360 means unrestricted.
    #[serde(default = "default_angle")]
    pub angle_deg: f64,
    /// Direction of the cone axis in degrees, counter-clockwise from +x.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Overrides the configured sense type.
    #[serde(default)]
    pub sense: Option<SenseType>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            angle_deg: default_angle(),
            rotation_deg: 0.,
            sense: None,
        }
    }
}

impl VisionConfig {
    pub fn cone(angle_deg: f64, rotation_deg: f64) -> Self {
        Self {
            angle_deg,
            rotation_deg,
            sense: None,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.angle_deg < 360.
    }

    /// Unit direction of the cone axis.
    pub fn axis(&self) -> Point2D {
        Point2D::from_angle(self.rotation_deg.to_radians())
    }

    /// Unit directions of the two cone boundaries, clockwise one first.
    pub fn boundaries(&self) -> (Point2D, Point2D) {
        let half = 0.5 * self.angle_deg.clamp(0., 360.).to_radians();
        let rot = self.rotation_deg.to_radians();
        (Point2D::from_angle(rot - half), Point2D::from_angle(rot + half))
    }

    /// Checks whether a direction lies inside the cone (boundary included).
    pub fn contains_direction(&self, dir: Point2D) -> bool {
        if !self.is_limited() || dir.length() < 1e-12 {
            return true;
        }
        let axis = self.axis();
        let angle = axis.cross(&dir).atan2(axis.dot(&dir)).abs();
        angle <= 0.5 * self.angle_deg.max(0.).to_radians() + ANGLE_TOL
    }

    /// Checks whether the whole polygon lies inside the cone seen from `origin`.
    pub fn contains_polygon(&self, origin: Point2D, poly: &Polygon2D) -> bool {
        if !self.is_limited() {
            return true;
        }
        poly.vertices().iter().all(|v| self.contains_direction(*v - origin))
            && !self.boundary_crosses(origin, poly)
    }

    /// Checks whether the polygon lies entirely outside the cone seen from `origin`.
    pub fn excludes_polygon(&self, origin: Point2D, poly: &Polygon2D) -> bool {
        if !self.is_limited() {
            return false;
        }
        !poly.is_point_inside(origin, true)
            && poly.vertices().iter().all(|v| !self.contains_direction(*v - origin))
            && !self.boundary_crosses(origin, poly)
    }

    /// Whether a cone boundary ray passes through a polygon edge.
    fn boundary_crosses(&self, origin: Point2D, poly: &Polygon2D) -> bool {
        let reach = 2. * poly
            .vertices()
            .iter()
            .map(|v| v.distance(&origin))
            .fold(0., f64::max)
            + 1.;
        let (b1, b2) = self.boundaries();
        [b1, b2].iter().any(|b| {
            let end = origin + *b * reach;
            poly.edges().any(|(e0, e1)| segments_cross(origin, end, e0, e1))
        })
    }
}

/// Point of view for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub point: Point,
    pub vision: Option<VisionConfig>,
    /// Token the viewer belongs to; never treated as an occluder.
    pub uid: Option<UID>,
}

impl Viewer {
    /// Viewer without a vision configuration.
    pub fn new(point: Point) -> Self {
        Self {
            point,
            vision: None,
            uid: None,
        }
    }

    /// Viewer with unrestricted vision.
    pub fn at(point: Point) -> Self {
        Self::new(point).with_vision(VisionConfig::default())
    }

    pub fn with_vision(mut self, vision: VisionConfig) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Eye at the token's footprint centre and top elevation.
    pub fn from_token(token: &Token) -> Self {
        Self {
            point: Point::from_2d(token.footprint.centroid(), token.top_z),
            vision: token.vision,
            uid: Some(token.uid.clone()),
        }
    }
}
