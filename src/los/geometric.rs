//! Visible area by exact polygon booleans in the view plane.
//!
//! Occluders are projected, clipped to a window around the projected target and
//! merged into one blocking region, which is then subtracted from every visible
//! target face.

use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::polygon2d::boolean::Region;
use crate::geom::projection::ViewTransform;
use crate::los::context::ComputationContext;
use crate::los::planes::{OccluderPlanes, Plane};
use crate::scene::SpatialQuery;
use anyhow::{Result, anyhow};
use log::{debug, warn};

/// Projected areas below this are treated as empty.
const MIN_PROJECTED_AREA: f64 = 1e-12;

/// Relative growth of the clipping window around the projected target.
const WINDOW_MARGIN: f64 = 0.01;

/// Unclamped fraction of the target visible from the viewer.
pub fn percent_visible<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>) -> Result<f64> {
    let view = ctx.view()?;
    let full_faces = project_planes(ctx.target_planes()?, view);
    let total_area: f64 = full_faces.iter().map(snapped_area).sum();
    if total_area < MIN_PROJECTED_AREA {
        return Ok(0.);
    }

    let window = view_window(&full_faces)?;
    let blocking = blocking_region(ctx.clipped_planes()?, view, &window);

    let visible_area: f64 = project_planes(ctx.visible_target_planes()?, view)
        .iter()
        .map(|face| match Region::from_polygon(face) {
            Ok(region) => region.difference(&blocking).area(),
            Err(err) => {
                warn!("Target face cannot be clipped, counting it as visible: {err}");
                face.area()
            }
        })
        .sum();

    let mut denominator = total_area;
    if ctx.caps_large_target() {
        let cell_area: f64 = project_planes(ctx.grid_cell_planes()?, view).iter().map(snapped_area).sum();
        if cell_area > MIN_PROJECTED_AREA {
            denominator = denominator.min(cell_area);
        }
    }

    if ctx.config.debug {
        debug!(
            "Geometric solver: visible {visible_area:.6} of {total_area:.6} (denominator {denominator:.6}), blocking pieces {}",
            blocking.len()
        );
    }
    Ok(visible_area / denominator)
}

/// Area measured on the fixed-point grid used by the blocking booleans.
fn snapped_area(face: &Polygon2D) -> f64 {
    Region::from_polygon(face).map_or_else(|_| face.area(), |region| region.area())
}

fn project_planes(planes: &[Plane], view: &ViewTransform) -> Vec<Polygon2D> {
    planes.iter().filter_map(|p| p.project(view)).collect()
}

/// Bounding box of the projected target grown by a small margin.
pub fn view_window(faces: &[Polygon2D]) -> Result<Polygon2D> {
    let pts: Vec<Point2D> = faces.iter().flat_map(|f| f.vertices().iter().copied()).collect();
    let bounds = BoundingBox2D::from_points(&pts).ok_or_else(|| anyhow!("Target has no projected faces"))?;
    Polygon2D::new(bounds.expanded(WINDOW_MARGIN).corners().to_vec())
}

fn project_to_window(plane: &Plane, view: &ViewTransform, window: &Polygon2D) -> Option<Polygon2D> {
    plane.project(view)?.clip_to_convex(window)
}

/// Union of every occluder group.
///
/// A group whose booleans fail is logged and contributes nothing.
pub fn blocking_region(planes: &OccluderPlanes, view: &ViewTransform, window: &Polygon2D) -> Region {
    let groups = [
        ("walls", opaque_region(&planes.walls, view, window)),
        ("tokens", opaque_region(&planes.tokens, view, window)),
        ("tiles", tile_region(&planes.tiles, view, window)),
        ("terrain walls", terrain_region(&planes.terrain_walls, view, window)),
    ];
    groups
        .into_iter()
        .fold(Region::new(), |acc, (name, group)| match group {
            Ok(region) => acc.union(&region),
            Err(err) => {
                warn!("Ignoring blocking {name}: {err}");
                acc
            }
        })
}

fn opaque_region(planes: &[Plane], view: &ViewTransform, window: &Polygon2D) -> Result<Region> {
    let polys: Vec<Polygon2D> = planes
        .iter()
        .filter_map(|p| project_to_window(p, view, window))
        .collect();
    Region::from_polygons(&polys)
}

/// Tiles with their drawing holes cut out.
fn tile_region(planes: &[Plane], view: &ViewTransform, window: &Polygon2D) -> Result<Region> {
    let mut region = Region::new();
    for plane in planes {
        let Some(projected) = project_to_window(plane, view, window) else {
            continue;
        };
        let mut tile = Region::from_polygon(&projected)?;
        if plane.holes.is_empty() {
            region = region.union(&tile);
            continue;
        }
        let ground = Polygon2D::new(plane.pts.iter().map(|p| p.to_2d()).collect())?;
        for hole in plane.holes.iter() {
            let Some(opening) = hole.clip_to_convex(&ground) else {
                continue;
            };
            let lifted = Plane::horizontal(&opening, plane.elevation(), plane.source.clone());
            if let Some(projected_hole) = project_to_window(&lifted, view, window) {
                tile = tile.difference(&Region::from_polygon(&projected_hole)?);
            }
        }
        region = region.union(&tile);
    }
    Ok(region)
}

/// Areas covered by at least two terrain walls.
fn terrain_region(planes: &[Plane], view: &ViewTransform, window: &Polygon2D) -> Result<Region> {
    if planes.len() < 2 {
        return Ok(Region::new());
    }
    let regions = planes
        .iter()
        .filter_map(|p| project_to_window(p, view, window))
        .map(|poly| Region::from_polygon(&poly))
        .collect::<Result<Vec<Region>>>()?;

    let mut overlap = Region::new();
    for (i, a) in regions.iter().enumerate() {
        for b in regions.iter().skip(i + 1) {
            overlap = overlap.union(&a.intersection(b));
        }
    }
    Ok(overlap)
}
