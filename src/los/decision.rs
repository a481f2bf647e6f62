//! Percent visible and the line-of-sight decision.

use crate::los::config::{LosConfig, VisibilityAlgorithm};
use crate::los::context::ComputationContext;
use crate::los::target::Target;
use crate::los::viewer::{Viewer, VisionConfig};
use crate::los::{area2d, geometric, points, raster};
use crate::scene::SpatialQuery;
use anyhow::{Result, bail};
use log::{debug, warn};
use rayon::prelude::*;

/// Percentages below this count as fully hidden.
pub const MIN_PERCENT: f64 = 0.005;

/// Tolerance for comparing a percentage with zero or with a threshold.
const PERCENT_TOL: f64 = 1e-8;

/// Returned when a solver fails.
const FALLBACK_PERCENT: f64 = 1.;

/// Fraction of the target visible from the viewer, in `[0, 1]`.
///
/// Fails if the configuration is invalid or the viewer has no vision
/// configuration. Solver failures are logged and yield full visibility.
pub fn percent_visible<Q: SpatialQuery + ?Sized>(
    viewer: &Viewer,
    target: &Target,
    scene: &Q,
    config: &LosConfig,
) -> Result<f64> {
    config.validate()?;
    let Some(vision) = viewer.vision.as_ref() else {
        bail!("Viewer has no vision configuration");
    };

    let ctx = ComputationContext::new(viewer, target, scene, config);
    let percent = match pre_test(&ctx, vision).and_then(|decided| match decided {
        Some(p) => Ok(p),
        None => solve(&ctx),
    }) {
        Ok(p) => p,
        Err(err) => {
            warn!("Visibility computation failed, assuming visible: {err:#}");
            FALLBACK_PERCENT
        }
    };
    Ok(finalize_percent(percent))
}

/// Checks whether the viewer has line of sight to the target.
pub fn has_los<Q: SpatialQuery + ?Sized>(
    viewer: &Viewer,
    target: &Target,
    scene: &Q,
    config: &LosConfig,
    threshold: f64,
) -> Result<bool> {
    Ok(los_from_percent(percent_visible(viewer, target, scene, config)?, threshold))
}

/// Threshold decision; an exact hit on the threshold passes.
pub fn los_from_percent(percent: f64, threshold: f64) -> bool {
    if percent.abs() < PERCENT_TOL {
        return false;
    }
    percent > threshold || (percent - threshold).abs() < PERCENT_TOL
}

/// Clamps to `[0, 1]` and snaps values below [`MIN_PERCENT`] to zero.
pub fn finalize_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.;
    }
    let p = percent.clamp(0., 1.);
    if p < MIN_PERCENT { 0. } else { p }
}

/// Evaluates many targets against one viewer in parallel.
///
/// Each result is independent of the others.
pub fn percent_visible_batch<Q: SpatialQuery + Sync + ?Sized>(
    viewer: &Viewer,
    targets: &[Target],
    scene: &Q,
    config: &LosConfig,
) -> Vec<Result<f64>> {
    targets
        .par_iter()
        .map(|target| percent_visible(viewer, target, scene, config))
        .collect()
}

/// Answers that need no occluder geometry.
fn pre_test<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>, vision: &VisionConfig) -> Result<Option<f64>> {
    let eye = ctx.viewer.point;
    let target = ctx.target;
    let eye_xy = eye.to_2d();

    // Standing over or under the footprint counts as seeing it
    if target.contains(eye) {
        return Ok(Some(1.));
    }
    if let Some(ground) = ctx.config.background_elevation {
        let below = eye.z < ground && target.bottom_z > ground;
        let above = eye.z > ground && target.top_z < ground;
        if below || above {
            debug!("Target is beyond the background elevation {ground}");
            return Ok(Some(0.));
        }
    }
    if vision.excludes_polygon(eye_xy, target.footprint()) {
        return Ok(Some(0.));
    }
    if ctx.blocking_objects()?.is_empty() && vision.contains_polygon(eye_xy, target.footprint()) {
        return Ok(Some(1.));
    }
    Ok(None)
}

fn solve<Q: SpatialQuery + ?Sized>(ctx: &ComputationContext<'_, Q>) -> Result<f64> {
    match ctx.config.algorithm {
        VisibilityAlgorithm::Points => points::percent_visible(ctx),
        VisibilityAlgorithm::Area2D => area2d::percent_visible(ctx),
        VisibilityAlgorithm::Area3DGeometric => geometric::percent_visible(ctx),
        VisibilityAlgorithm::Area3DRasterized => raster::solver::percent_visible(ctx),
        VisibilityAlgorithm::Hybrid => {
            if ctx.blocking_objects()?.has_tiles() {
                raster::solver::percent_visible(ctx)
            } else {
                geometric::percent_visible(ctx)
            }
        }
    }
}
