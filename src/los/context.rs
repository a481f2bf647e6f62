//! Per-query cache of derived geometry.
//!
//! A [`ComputationContext`] lives for one viewer/target query. Each artifact is
//! computed on first use and dropped together with the context.

use crate::geom::polygon2d::Polygon2D;
use crate::geom::projection::ViewTransform;
use crate::los::classify::{BlockingObjects, VisionPolygon, elevation_range, find_blocking_objects};
use crate::los::config::LosConfig;
use crate::los::frustum::{clip_occluder_planes, clip_to_near};
use crate::los::planes::{OccluderPlanes, Plane, prism_faces, target_planes, target_visible_planes};
use crate::los::target::Target;
use crate::los::viewer::Viewer;
use crate::scene::{OccluderKind, OccluderRef, SpatialQuery};
use crate::uid::UID;
use anyhow::Result;
use once_cell::unsync::OnceCell;

pub struct ComputationContext<'a, Q: SpatialQuery + ?Sized> {
    pub viewer: &'a Viewer,
    pub target: &'a Target,
    pub scene: &'a Q,
    pub config: &'a LosConfig,
    vision_polygon: OnceCell<VisionPolygon>,
    view: OnceCell<ViewTransform>,
    blocking_objects: OnceCell<BlockingObjects<'a>>,
    occluder_planes: OnceCell<OccluderPlanes>,
    clipped_planes: OnceCell<OccluderPlanes>,
    target_planes: OnceCell<Vec<Plane>>,
    visible_target_planes: OnceCell<Vec<Plane>>,
    grid_cell_planes: OnceCell<Vec<Plane>>,
}

impl<'a, Q: SpatialQuery + ?Sized> ComputationContext<'a, Q> {
    pub fn new(viewer: &'a Viewer, target: &'a Target, scene: &'a Q, config: &'a LosConfig) -> Self {
        Self {
            viewer,
            target,
            scene,
            config,
            vision_polygon: OnceCell::new(),
            view: OnceCell::new(),
            blocking_objects: OnceCell::new(),
            occluder_planes: OnceCell::new(),
            clipped_planes: OnceCell::new(),
            target_planes: OnceCell::new(),
            visible_target_planes: OnceCell::new(),
            grid_cell_planes: OnceCell::new(),
        }
    }

    /// Elevation band spanned by the viewer and the target.
    pub fn elevation_range(&self) -> (f64, f64) {
        elevation_range(self.viewer, self.target)
    }

    pub fn vision_polygon(&self) -> Result<&VisionPolygon> {
        self.vision_polygon
            .get_or_try_init(|| VisionPolygon::new(self.viewer.point.to_2d(), self.target.footprint()))
    }

    /// View from the viewer aimed at the target centre.
    pub fn view(&self) -> Result<&ViewTransform> {
        self.view
            .get_or_try_init(|| ViewTransform::for_target(self.viewer.point, self.target.center(), &self.target.corners()))
    }

    pub fn blocking_objects(&self) -> Result<&BlockingObjects<'a>> {
        self.blocking_objects.get_or_try_init(|| {
            let vision = self.vision_polygon()?;
            Ok(find_blocking_objects(self.viewer, self.target, vision, self.scene, self.config))
        })
    }

    /// Occluder planes before clipping.
    pub fn occluder_planes(&self) -> Result<&OccluderPlanes> {
        self.occluder_planes.get_or_try_init(|| {
            let (zmin, zmax) = self.elevation_range();
            Ok(crate::los::planes::occluder_planes(
                self.blocking_objects()?,
                self.viewer,
                zmin,
                zmax,
            ))
        })
    }

    /// Occluder planes clipped to the vision polygon and the near plane.
    pub fn clipped_planes(&self) -> Result<&OccluderPlanes> {
        self.clipped_planes.get_or_try_init(|| {
            Ok(clip_occluder_planes(
                self.occluder_planes()?,
                self.vision_polygon()?,
                self.view()?,
            ))
        })
    }

    /// Target faces over the full footprint.
    pub fn target_planes(&self) -> Result<&[Plane]> {
        self.target_planes
            .get_or_try_init(|| {
                let view = self.view()?;
                Ok(near_clipped(target_planes(self.target, self.viewer.point), view))
            })
            .map(Vec::as_slice)
    }

    /// Target faces over the visible shape.
    pub fn visible_target_planes(&self) -> Result<&[Plane]> {
        self.visible_target_planes
            .get_or_try_init(|| {
                let view = self.view()?;
                Ok(near_clipped(target_visible_planes(self.target, self.viewer.point), view))
            })
            .map(Vec::as_slice)
    }

    /// Faces of one grid cell centred on the target, over the target's height.
    pub fn grid_cell_planes(&self) -> Result<&[Plane]> {
        self.grid_cell_planes
            .get_or_try_init(|| {
                let size = self.config.grid_size;
                let center = self.target.center();
                let cell = Polygon2D::rectangle(center.x - size / 2., center.y - size / 2., size, size)?;
                let source = OccluderRef::new(OccluderKind::Target, &UID::from("grid-cell"));
                let faces = prism_faces(&cell, self.target.bottom_z, self.target.top_z, self.viewer.point, source);
                Ok(near_clipped(faces, self.view()?))
            })
            .map(Vec::as_slice)
    }

    /// True when the denominator is capped at one grid cell.
    pub fn caps_large_target(&self) -> bool {
        self.config.large_target && self.target.is_large(self.config.grid_size)
    }
}

fn near_clipped(planes: Vec<Plane>, view: &ViewTransform) -> Vec<Plane> {
    planes.iter().filter_map(|p| clip_to_near(p, view)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::geom::point2d::Point2D;
    use crate::scene::{Scene, Wall};

    #[test]
    fn test_context_pipeline() -> Result<()> {
        let viewer = Viewer::at(Point::new(0., 0., 0.));
        let target = Target::new(Polygon2D::rectangle(250., -50., 100., 100.)?, 0., 100.)?;
        let mut scene = Scene::new();
        scene.walls.push(Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)));
        let config = LosConfig::new();
        let ctx = ComputationContext::new(&viewer, &target, &scene, &config);

        assert_eq!(ctx.blocking_objects()?.walls.len(), 1);
        assert_eq!(ctx.occluder_planes()?.walls.len(), 1);
        let clipped = ctx.clipped_planes()?;
        assert_eq!(clipped.walls.len(), 1);
        // 60 wide after clipping, 100 high
        assert!((clipped.walls[0].area() - 6000.).abs() < 1e-6);
        assert_eq!(ctx.target_planes()?.len(), 1);
        assert_eq!(ctx.elevation_range(), (0., 100.));
        assert!(!ctx.caps_large_target());

        // Cached: the same allocation is returned twice
        assert!(std::ptr::eq(ctx.view()?, ctx.view()?));
        Ok(())
    }

    #[test]
    fn test_grid_cell_planes() -> Result<()> {
        let viewer = Viewer::at(Point::new(0., 0., 0.));
        let target = Target::new(Polygon2D::rectangle(200., -100., 200., 200.)?, 0., 100.)?;
        let scene = Scene::new();
        let mut config = LosConfig::new();
        config.large_target = true;
        let ctx = ComputationContext::new(&viewer, &target, &scene, &config);
        assert!(ctx.caps_large_target());
        let cell = ctx.grid_cell_planes()?;
        assert_eq!(cell.len(), 1);
        assert!((cell[0].area() - 10000.).abs() < 1e-6);
        Ok(())
    }
}
