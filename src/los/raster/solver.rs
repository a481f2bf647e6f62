//! Visible area by counting pixels of the projected target.
//!
//! Channels of one RGBA buffer hold the target, the occluders that erase it and
//! the terrain walls that only block where two of them pile up.

use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::projection::ViewTransform;
use crate::los::context::ComputationContext;
use crate::los::geometric::view_window;
use crate::los::planes::Plane;
use crate::los::raster::software::SoftwareRasterizer;
use crate::los::raster::{BlendMode, Channel, RasterBuffer, Rasterizer};
use crate::scene::{SpatialQuery, Tile};
use anyhow::Result;
use log::debug;

/// Terrain walls add this much to the blue channel; two of them block.
const TERRAIN_STEP: f32 = 0.5;

/// Unclamped fraction of the target visible from the viewer, by pixel counting.
pub fn percent_visible<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>) -> Result<f64> {
    percent_visible_with(ctx, &SoftwareRasterizer::new())
}

/// Same as [`percent_visible`] with a caller-provided rasterizer.
pub fn percent_visible_with<Q, R>(ctx: &ComputationContext<'_, Q>, rasterizer: &R) -> Result<f64>
where
    Q: SpatialQuery + ?Sized,
    R: Rasterizer + ?Sized,
{
    let view = ctx.view()?;
    let full_faces = project_planes(ctx.target_planes()?, view);
    if full_faces.is_empty() {
        return Ok(0.);
    }
    let window = view_window(&full_faces)?;
    let mut buffer = RasterBuffer::new(window.bounds(), ctx.config.raster_resolution)?;

    rasterizer.render(&mut buffer, &full_faces, BlendMode::Replace(1.), Channel::Green);
    let total = rasterizer.count(&buffer, &|px| px[1] > 0.5);
    if total == 0 {
        return Ok(0.);
    }

    let visible_faces = project_planes(ctx.visible_target_planes()?, view);
    rasterizer.render(&mut buffer, &visible_faces, BlendMode::Replace(1.), Channel::Red);

    let planes = ctx.clipped_planes()?;
    let erase = BlendMode::DestinationOut(1.);
    rasterizer.render(&mut buffer, &project_planes(&planes.walls, view), erase, Channel::Red);
    rasterizer.render(&mut buffer, &project_planes(&planes.tokens, view), erase, Channel::Red);
    rasterizer.render(
        &mut buffer,
        &project_planes(&planes.terrain_walls, view),
        BlendMode::Additive(TERRAIN_STEP),
        Channel::Blue,
    );

    let tiles = &ctx.blocking_objects()?.tiles;
    for plane in planes.tiles.iter() {
        let Some(projected) = plane.project(view) else {
            continue;
        };
        let tile = tiles.iter().find(|t| t.uid == plane.source.uid).copied();
        let mask = |ndc: Point2D| tile_blocks_at(view, plane, tile, ndc);
        rasterizer.render_masked(&mut buffer, &[projected], erase, Channel::Red, &mask);
    }

    let visible = rasterizer.count(&buffer, &|px| px[0] > 0.5 && px[2] < 1.);

    let mut denominator = total;
    if ctx.caps_large_target() {
        let cell = project_planes(ctx.grid_cell_planes()?, view);
        rasterizer.render(&mut buffer, &cell, BlendMode::Replace(1.), Channel::Alpha);
        let cell_pixels = rasterizer.count(&buffer, &|px| px[3] > 0.5);
        if cell_pixels > 0 {
            denominator = denominator.min(cell_pixels);
        }
    }

    if ctx.config.debug {
        debug!(
            "Raster solver: {}x{} buffer, {visible} of {total} target pixels visible (denominator {denominator})",
            buffer.width(),
            buffer.height()
        );
    }
    Ok(visible as f64 / denominator as f64)
}

fn project_planes(planes: &[Plane], view: &ViewTransform) -> Vec<Polygon2D> {
    planes.iter().filter_map(|p| p.project(view)).collect()
}

/// Follows the pixel ray down to the tile and samples it there.
///
/// Openings cut by drawings never block.
fn tile_blocks_at(view: &ViewTransform, plane: &Plane, tile: Option<&Tile>, ndc: Point2D) -> bool {
    let eye = view.eye();
    let dir = view.ray_through(ndc);
    if dir.dz.abs() < f64::EPSILON {
        return false;
    }
    let t = (plane.elevation() - eye.z) / dir.dz;
    if t <= 0. {
        return false;
    }
    let ground = (eye + dir * t).to_2d();
    if plane.holes.iter().any(|hole| hole.is_point_inside(ground, false)) {
        return false;
    }
    tile.is_none_or(|t| t.is_opaque_at(ground))
}
