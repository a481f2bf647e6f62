//! Top-down visible area, ignoring elevation.
//!
//! Every blocking wall and token edge casts a shadow away from the viewer on
//! the ground plane. The visible shape minus the shadows is compared with the
//! target footprint.

use crate::geom::EPS;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::polygon2d::boolean::Region;
use crate::los::context::ComputationContext;
use crate::scene::{SpatialQuery, Wall};
use anyhow::Result;
use log::{debug, warn};

/// Segments subtending more than this are split before casting a shadow.
const MAX_SHADOW_ANGLE: f64 = std::f64::consts::FRAC_PI_2;

const MAX_SPLIT_DEPTH: usize = 8;

pub fn percent_visible<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>) -> Result<f64> {
    let target = ctx.target;
    let viewer = ctx.viewer.point.to_2d();
    let total = target.footprint().area();
    if total < EPS {
        return Ok(0.);
    }

    // Shadows must reach past the far side of the target
    let reach = 2. * target
        .footprint()
        .vertices()
        .iter()
        .map(|v| v.distance(&viewer))
        .fold(0., f64::max)
        + 1.;

    let objects = ctx.blocking_objects()?;
    let mut opaque_walls: Vec<&Wall> = objects.walls.clone();
    opaque_walls.extend(objects.cone_walls.iter());
    let mut shadows: Vec<Polygon2D> = opaque_walls
        .iter()
        .flat_map(|w| wall_shadows(viewer, w, reach))
        .collect();
    for token in objects.tokens.iter() {
        for (a, b) in token.footprint.edges() {
            shadow_polygons(viewer, a, b, reach, 0, &mut shadows);
        }
    }

    let mut blocking = match Region::from_polygons(&shadows) {
        Ok(region) => region,
        Err(err) => {
            warn!("Ignoring wall and token shadows: {err}");
            Region::new()
        }
    };
    match terrain_overlap(viewer, &objects.terrain_walls, reach) {
        Ok(overlap) => blocking = blocking.union(&overlap),
        Err(err) => warn!("Ignoring terrain wall shadows: {err}"),
    }

    let visible = Region::from_polygon(target.visible_shape())?.difference(&blocking).area();
    let mut denominator = total;
    if ctx.caps_large_target() {
        denominator = denominator.min(ctx.config.grid_size * ctx.config.grid_size);
    }

    if ctx.config.debug {
        debug!("Area2D solver: visible {visible:.3} of {total:.3} (denominator {denominator:.3})");
    }
    Ok(visible / denominator)
}

fn wall_shadows(viewer: Point2D, wall: &Wall, reach: f64) -> Vec<Polygon2D> {
    let mut out = Vec::new();
    shadow_polygons(viewer, wall.a, wall.b, reach, 0, &mut out);
    out
}

/// Quadrilaterals between segment a-b and its extension away from the viewer.
///
/// Wide segments are split so that each quad's far edge stays beyond `reach / 2`.
fn shadow_polygons(viewer: Point2D, a: Point2D, b: Point2D, reach: f64, depth: usize, out: &mut Vec<Polygon2D>) {
    let (da, db) = (a - viewer, b - viewer);
    if da.length() < EPS || db.length() < EPS {
        return;
    }
    let angle = da.cross(&db).atan2(da.dot(&db)).abs();
    if angle > MAX_SHADOW_ANGLE && depth < MAX_SPLIT_DEPTH {
        let mid = a.lerp(&b, 0.5);
        shadow_polygons(viewer, a, mid, reach, depth + 1, out);
        shadow_polygons(viewer, mid, b, reach, depth + 1, out);
        return;
    }
    let far_a = viewer + da * (reach / da.length());
    let far_b = viewer + db * (reach / db.length());
    // Collinear with the viewer: no area
    if let Ok(quad) = Polygon2D::new(vec![a, b, far_b, far_a])
        && quad.area() > EPS
        && quad.is_simple()
    {
        out.push(quad);
    }
}

/// Ground areas shadowed by at least two terrain walls.
fn terrain_overlap(viewer: Point2D, walls: &[&Wall], reach: f64) -> Result<Region> {
    if walls.len() < 2 {
        return Ok(Region::new());
    }
    let shadows = walls
        .iter()
        .map(|w| Region::from_polygons(&wall_shadows(viewer, w, reach)))
        .collect::<Result<Vec<Region>>>()?;
    let mut overlap = Region::new();
    for (i, a) in shadows.iter().enumerate() {
        for b in shadows.iter().skip(i + 1) {
            overlap = overlap.union(&a.intersection(b));
        }
    }
    Ok(overlap)
}
