//! Visibility by casting segments to sample points on the target.

use crate::Point;
use crate::geom::ray::segment_hits_polygon;
use crate::los::context::ComputationContext;
use crate::los::planes::{OccluderPlanes, Plane};
use crate::scene::{SpatialQuery, Tile};
use anyhow::Result;
use log::debug;

/// Fraction of sample points the viewer can reach unobstructed.
///
/// Each visible target face contributes its corners pulled toward the face
/// centre by `LosConfig::points_inset`. Occluders are tested unclipped.
pub fn percent_visible<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>) -> Result<f64> {
    let samples = sample_points(ctx.visible_target_planes()?, ctx.config.points_inset);
    let samples = if samples.is_empty() {
        vec![ctx.target.center()]
    } else {
        samples
    };

    let planes = ctx.occluder_planes()?;
    let tiles = &ctx.blocking_objects()?.tiles;
    let eye = ctx.viewer.point;
    let visible = samples
        .iter()
        .filter(|pt| !is_blocked(eye, **pt, planes, tiles))
        .count();

    if ctx.config.debug {
        debug!("Points solver: {visible} of {} samples visible", samples.len());
    }
    Ok(visible as f64 / samples.len() as f64)
}

/// Face corners moved toward the face centre, `inset` of the way out.
pub fn sample_points(faces: &[Plane], inset: f64) -> Vec<Point> {
    faces
        .iter()
        .filter(|f| !f.pts.is_empty())
        .flat_map(|face| {
            let n = face.pts.len() as f64;
            let (sx, sy, sz) = face
                .pts
                .iter()
                .fold((0., 0., 0.), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
            let center = Point::new(sx / n, sy / n, sz / n);
            face.pts.iter().map(move |p| center + (*p - center) * inset)
        })
        .collect()
}

/// Checks whether the segment eye->pt is blocked by any occluder plane.
///
/// Terrain walls block only when the segment passes through two of them.
pub fn is_blocked(eye: Point, pt: Point, planes: &OccluderPlanes, tiles: &[&Tile]) -> bool {
    let hits = |p: &Plane| segment_hits_polygon(eye, pt, &p.pts);

    if planes.walls.iter().chain(planes.tokens.iter()).any(|p| hits(p).is_some()) {
        return true;
    }

    let tile_blocks = planes.tiles.iter().any(|plane| {
        let Some(hit) = hits(plane) else {
            return false;
        };
        let ground = hit.to_2d();
        if plane.holes.iter().any(|h| h.is_point_inside(ground, false)) {
            return false;
        }
        tiles
            .iter()
            .find(|t| t.uid == plane.source.uid)
            .is_none_or(|t| t.is_opaque_at(ground))
    });
    if tile_blocks {
        return true;
    }

    planes.terrain_walls.iter().filter(|p| hits(p).is_some()).count() >= 2
}
