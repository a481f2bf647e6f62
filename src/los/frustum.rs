//! Clipping of occluder planes to the region the viewer looks through.
//!
//! Geometry on the vision polygon boundary is kept: one inclusive rule for
//! vertical and horizontal planes alike.

use crate::Point;
use crate::geom::EPS;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::projection::ViewTransform;
use crate::geom::segment::clip_segment_to_convex;
use crate::los::classify::VisionPolygon;
use crate::los::planes::{OccluderPlanes, Plane, PlaneOrientation};

/// Part of a plane inside the vision polygon.
///
/// Vertical planes keep the part of their base segment inside the polygon;
/// horizontal planes are clipped as polygons.
pub fn clip_to_vision(plane: &Plane, vision: &VisionPolygon) -> Vec<Plane> {
    match plane.orientation {
        PlaneOrientation::Vertical => {
            let Some((a, b, bottom, top)) = plane.vertical_extent() else {
                return Vec::new();
            };
            clip_segment_to_convex(a, b, vision.vertices())
                .and_then(|(p0, p1)| Plane::vertical(p0, p1, bottom, top, plane.source.clone()))
                .into_iter()
                .collect()
        }
        PlaneOrientation::Horizontal => {
            let Ok(ground) = Polygon2D::new(plane.pts.iter().map(|p| p.to_2d()).collect()) else {
                return Vec::new();
            };
            ground
                .clip_to_convex(vision.polygon())
                .map(|clipped| {
                    let mut out = Plane::horizontal(&clipped, plane.elevation(), plane.source.clone());
                    out.holes = plane.holes.clone();
                    out
                })
                .into_iter()
                .collect()
        }
    }
}

/// Part of a plane in front of the camera's near plane.
///
/// Returns the plane unchanged when it lies entirely in front.
pub fn clip_to_near(plane: &Plane, view: &ViewTransform) -> Option<Plane> {
    let near = view.near();
    let depths: Vec<f64> = plane.pts.iter().map(|p| view.depth(*p)).collect();
    if depths.iter().all(|d| *d >= near) {
        return Some(plane.clone());
    }
    if depths.iter().all(|d| *d < near) {
        return None;
    }

    let n = plane.pts.len();
    let mut pts: Vec<Point> = Vec::with_capacity(n + 1);
    for i in 0..n {
        let j = (i + n - 1) % n;
        let (current, previous) = (plane.pts[i], plane.pts[j]);
        let (d_curr, d_prev) = (depths[i], depths[j]);
        let curr_inside = d_curr >= near;
        let prev_inside = d_prev >= near;
        if curr_inside != prev_inside {
            let t = (near - d_prev) / (d_curr - d_prev);
            pts.push(Point::new_between_2_points(previous, current, t));
        }
        if curr_inside {
            pts.push(current);
        }
    }
    pts.dedup_by(|a, b| a.distance(b) < EPS);

    let clipped = Plane {
        pts,
        source: plane.source.clone(),
        orientation: plane.orientation,
        holes: plane.holes.clone(),
    };
    if clipped.is_degenerate() { None } else { Some(clipped) }
}

/// Clips every plane to the vision polygon, then to the near plane.
///
/// Degenerate pieces are dropped.
pub fn clip_planes(planes: &[Plane], vision: &VisionPolygon, view: &ViewTransform) -> Vec<Plane> {
    planes
        .iter()
        .flat_map(|p| clip_to_vision(p, vision))
        .filter_map(|p| clip_to_near(&p, view))
        .filter(|p| !p.is_degenerate())
        .collect()
}

pub fn clip_occluder_planes(planes: &OccluderPlanes, vision: &VisionPolygon, view: &ViewTransform) -> OccluderPlanes {
    OccluderPlanes {
        walls: clip_planes(&planes.walls, vision, view),
        terrain_walls: clip_planes(&planes.terrain_walls, vision, view),
        tiles: clip_planes(&planes.tiles, vision, view),
        tokens: clip_planes(&planes.tokens, vision, view),
    }
}
