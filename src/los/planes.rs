//! Planar faces of occluders and of the target.

use crate::Point;
use crate::geom::EPS;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::projection::ViewTransform;
use crate::los::classify::BlockingObjects;
use crate::los::target::Target;
use crate::los::viewer::Viewer;
use crate::scene::{Drawing, OccluderKind, OccluderRef, Tile, Token, Wall};
use crate::uid::UID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneOrientation {
    /// Wall or token side; stands on a base segment
    Vertical,
    /// Tile, token top or bottom
    Horizontal,
}

/// Planar polygon in world space with a reference to its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub pts: Vec<Point>,
    pub source: OccluderRef,
    pub orientation: PlaneOrientation,
    /// Openings in a horizontal plane, on the ground plane
    pub holes: Vec<Polygon2D>,
}

impl Plane {
    /// Vertical quad over segment a->b between two elevations.
    ///
    /// Returns `None` for a zero-length base or an empty elevation range.
    pub fn vertical(a: Point2D, b: Point2D, bottom: f64, top: f64, source: OccluderRef) -> Option<Self> {
        if a.distance(&b) < EPS || top - bottom < EPS {
            return None;
        }
        Some(Self {
            pts: vec![
                Point::from_2d(a, bottom),
                Point::from_2d(b, bottom),
                Point::from_2d(b, top),
                Point::from_2d(a, top),
            ],
            source,
            orientation: PlaneOrientation::Vertical,
            holes: Vec::new(),
        })
    }

    /// Horizontal copy of `poly` at elevation `z`.
    pub fn horizontal(poly: &Polygon2D, z: f64, source: OccluderRef) -> Self {
        Self {
            pts: poly.vertices().iter().map(|p| Point::from_2d(*p, z)).collect(),
            source,
            orientation: PlaneOrientation::Horizontal,
            holes: Vec::new(),
        }
    }

    /// Base segment and elevation range of a vertical plane.
    pub fn vertical_extent(&self) -> Option<(Point2D, Point2D, f64, f64)> {
        if self.orientation != PlaneOrientation::Vertical || self.pts.len() != 4 {
            return None;
        }
        Some((self.pts[0].to_2d(), self.pts[1].to_2d(), self.pts[0].z, self.pts[2].z))
    }

    /// Elevation of a horizontal plane.
    pub fn elevation(&self) -> f64 {
        self.pts.first().map_or(0., |p| p.z)
    }

    /// Area of the planar polygon.
    pub fn area(&self) -> f64 {
        let n = self.pts.len();
        let (mut nx, mut ny, mut nz) = (0., 0., 0.);
        for i in 0..n {
            let a = self.pts[i];
            let b = self.pts[(i + 1) % n];
            nx += (a.y - b.y) * (a.z + b.z);
            ny += (a.z - b.z) * (a.x + b.x);
            nz += (a.x - b.x) * (a.y + b.y);
        }
        0.5 * (nx * nx + ny * ny + nz * nz).sqrt()
    }

    pub fn is_degenerate(&self) -> bool {
        self.pts.len() < 3 || self.area() < EPS
    }

    /// Polygon in normalized device coordinates.
    ///
    /// `None` if a vertex is behind the near plane or the projection collapses.
    pub fn project(&self, view: &ViewTransform) -> Option<Polygon2D> {
        Polygon2D::new(view.project_polygon(&self.pts)?).ok()
    }
}

/// Face planes of an occluder group, before clipping.
#[derive(Debug, Default, Clone)]
pub struct OccluderPlanes {
    /// Opaque walls and vision cone walls
    pub walls: Vec<Plane>,
    pub terrain_walls: Vec<Plane>,
    pub tiles: Vec<Plane>,
    pub tokens: Vec<Plane>,
}

/// Wall quad clamped to the elevation band `[zmin, zmax]`.
pub fn wall_plane(wall: &Wall, kind: OccluderKind, zmin: f64, zmax: f64) -> Option<Plane> {
    let bottom = wall.bottom_z().max(zmin);
    let top = wall.top_z().min(zmax);
    Plane::vertical(wall.a, wall.b, bottom, top, OccluderRef::new(kind, &wall.uid))
}

/// Tile quad with the holes cut by drawings at its elevation.
pub fn tile_plane(tile: &Tile, drawings: &[&Drawing]) -> Option<Plane> {
    let footprint = tile.footprint().ok()?;
    let mut plane = Plane::horizontal(&footprint, tile.elevation, OccluderRef::new(OccluderKind::Tile, &tile.uid));
    plane.holes = drawings
        .iter()
        .filter(|d| d.hole && (d.elevation - tile.elevation).abs() < EPS && d.shape.intersects_polygon(&footprint))
        .map(|d| d.shape.clone())
        .collect();
    Some(plane)
}

/// Faces of an extruded footprint that the viewer can see.
///
/// Top only from above, bottom only from below, and sides for the footprint
/// edges facing the viewer.
pub fn prism_faces(footprint: &Polygon2D, bottom: f64, top: f64, viewer: Point, source: OccluderRef) -> Vec<Plane> {
    let mut faces = Vec::new();
    if viewer.z > top {
        faces.push(Plane::horizontal(footprint, top, source.clone()));
    }
    if viewer.z < bottom {
        faces.push(Plane::horizontal(footprint, bottom, source.clone()));
    }
    for (a, b) in footprint.viewable_edges(viewer.to_2d()) {
        if let Some(side) = Plane::vertical(a, b, bottom, top, source.clone()) {
            faces.push(side);
        }
    }
    faces.retain(|f| !f.is_degenerate());
    faces
}

pub fn token_planes(token: &Token, viewer: Point) -> Vec<Plane> {
    prism_faces(
        &token.footprint,
        token.bottom_z,
        token.top_z,
        viewer,
        OccluderRef::new(OccluderKind::Token, &token.uid),
    )
}

fn target_ref(target: &Target) -> OccluderRef {
    OccluderRef {
        kind: OccluderKind::Target,
        uid: target.uid.clone().unwrap_or_else(|| UID::from("target")),
    }
}

/// Target faces over the full footprint; these form the denominator.
pub fn target_planes(target: &Target, viewer: Point) -> Vec<Plane> {
    prism_faces(target.footprint(), target.bottom_z, target.top_z, viewer, target_ref(target))
}

/// Target faces over the visible shape; these form the numerator.
pub fn target_visible_planes(target: &Target, viewer: Point) -> Vec<Plane> {
    prism_faces(target.visible_shape(), target.bottom_z, target.top_z, viewer, target_ref(target))
}

/// Builds the planes of every classified occluder.
///
/// Walls are clamped to the elevation band spanned by the viewer and the target.
pub fn occluder_planes(objects: &BlockingObjects<'_>, viewer: &Viewer, zmin: f64, zmax: f64) -> OccluderPlanes {
    let mut planes = OccluderPlanes::default();
    planes.walls.extend(
        objects
            .walls
            .iter()
            .filter_map(|w| wall_plane(w, OccluderKind::Wall, zmin, zmax)),
    );
    planes.walls.extend(
        objects
            .cone_walls
            .iter()
            .filter_map(|w| wall_plane(w, OccluderKind::VisionCone, zmin, zmax)),
    );
    planes.terrain_walls.extend(
        objects
            .terrain_walls
            .iter()
            .filter_map(|w| wall_plane(w, OccluderKind::TerrainWall, zmin, zmax)),
    );
    planes
        .tiles
        .extend(objects.tiles.iter().filter_map(|t| tile_plane(t, &objects.drawings)));
    planes
        .tokens
        .extend(objects.tokens.iter().flat_map(|t| token_planes(t, viewer.point)));
    planes
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_wall_plane_clamped() {
        let wall = Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.));
        let plane = wall_plane(&wall, OccluderKind::Wall, 0., 100.).unwrap();
        let (a, b, bottom, top) = plane.vertical_extent().unwrap();
        assert!(a.is_close(&Point2D::new(150., -50.)) && b.is_close(&Point2D::new(150., 50.)));
        assert_eq!((bottom, top), (0., 100.));
        assert!((plane.area() - 10000.).abs() < 1e-6);

        let low = wall.clone().with_elevation(Some(-20.), Some(0.));
        assert!(wall_plane(&low, OccluderKind::Wall, 0., 100.).is_none());
    }

    #[test]
    fn test_target_faces_from_level_viewer() -> Result<()> {
        let target = Target::new(Polygon2D::rectangle(250., -50., 100., 100.)?, 0., 100.)?;
        // Viewer inside the elevation band sees only the west side
        let faces = target_planes(&target, Point::new(0., 0., 50.));
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].orientation, PlaneOrientation::Vertical);
        assert_eq!(faces[0].source.kind, OccluderKind::Target);

        // From above: top face plus the west side
        let faces = target_planes(&target, Point::new(0., 0., 200.));
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().any(|f| f.orientation == PlaneOrientation::Horizontal && f.elevation() == 100.));

        // From below and to the south-west: bottom, west and south
        let faces = target_planes(&target, Point::new(0., -200., -10.));
        assert_eq!(faces.len(), 3);
        Ok(())
    }

    #[test]
    fn test_visible_planes_use_constrained_shape() -> Result<()> {
        let target = Target::new(Polygon2D::rectangle(250., -50., 100., 100.)?, 0., 100.)?
            .with_constrained_shape(Polygon2D::rectangle(250., -50., 100., 50.)?);
        let faces = target_visible_planes(&target, Point::new(0., 0., 50.));
        let area: f64 = faces.iter().map(|f| f.area()).sum();
        assert!((area - 5000.).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_tile_plane_holes() -> Result<()> {
        let tile = Tile::new(0., 0., 100., 100., 10.);
        let inside = Drawing::hole(Polygon2D::rectangle(10., 10., 10., 10.)?, 10.);
        let elsewhere = Drawing::hole(Polygon2D::rectangle(500., 500., 10., 10.)?, 10.);
        let plane = tile_plane(&tile, &[&inside, &elsewhere]).unwrap();
        assert_eq!(plane.holes.len(), 1);
        assert_eq!(plane.orientation, PlaneOrientation::Horizontal);
        assert_eq!(plane.elevation(), 10.);
        Ok(())
    }
}
