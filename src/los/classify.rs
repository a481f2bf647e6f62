//! Reduction of the scene to the objects that can block one viewer/target pair.

use crate::geom::EPS;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::los::config::{BlockingConfig, LosConfig};
use crate::los::target::Target;
use crate::los::viewer::{VisionConfig, Viewer};
use crate::scene::{Drawing, SenseType, SpatialQuery, Tile, Token, Wall, WallSenseType};
use anyhow::Result;
use log::debug;

/// Area between the viewer and the target footprint, on the ground plane.
#[derive(Debug, Clone)]
pub struct VisionPolygon {
    polygon: Polygon2D,
}

impl VisionPolygon {
    /// Convex hull of the viewer position and the target footprint.
    pub fn new(viewer: Point2D, footprint: &Polygon2D) -> Result<Self> {
        let mut pts = footprint.vertices().to_vec();
        pts.push(viewer);
        Ok(Self {
            polygon: Polygon2D::convex_hull(&pts)?,
        })
    }

    pub fn polygon(&self) -> &Polygon2D {
        &self.polygon
    }

    /// Counter-clockwise vertices.
    pub fn vertices(&self) -> &[Point2D] {
        self.polygon.vertices()
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.polygon.bounds()
    }

    pub fn contains(&self, pt: Point2D) -> bool {
        self.polygon.is_point_inside(pt, true)
    }

    /// Boundary-touching segments count as intersecting.
    pub fn intersects_segment(&self, a: Point2D, b: Point2D) -> bool {
        self.polygon.intersects_segment(a, b)
    }

    pub fn intersects_polygon(&self, other: &Polygon2D) -> bool {
        self.polygon.intersects_polygon(other)
    }
}

/// Objects that may block the view, grouped by how they block.
#[derive(Debug, Default)]
pub struct BlockingObjects<'a> {
    pub walls: Vec<&'a Wall>,
    /// Limited walls; block only where two or more overlap
    pub terrain_walls: Vec<&'a Wall>,
    /// Synthetic walls closing off directions outside the vision cone
    pub cone_walls: Vec<Wall>,
    pub tiles: Vec<&'a Tile>,
    pub tokens: Vec<&'a Token>,
    /// Holes cut into the classified tiles
    pub drawings: Vec<&'a Drawing>,
}

impl<'a> BlockingObjects<'a> {
    /// True when no scene object can block.
    ///
    /// Vision cone walls are not counted, and a single terrain wall cannot block on its own.
    pub fn is_empty(&self) -> bool {
        self.walls.is_empty() && self.tiles.is_empty() && self.tokens.is_empty() && self.terrain_walls.len() < 2
    }

    pub fn has_tiles(&self) -> bool {
        !self.tiles.is_empty()
    }
}

/// Sense used for the query: the viewer's own, else the configured one.
pub fn query_sense(viewer: &Viewer, config: &LosConfig) -> SenseType {
    viewer.vision.and_then(|v| v.sense).unwrap_or(config.sense_type)
}

/// Elevation band an occluder must reach into to block.
pub fn elevation_range(viewer: &Viewer, target: &Target) -> (f64, f64) {
    (viewer.point.z.min(target.bottom_z), viewer.point.z.max(target.top_z))
}

fn token_enabled(token: &Token, blocking: &BlockingConfig) -> bool {
    if token.dead {
        blocking.dead_tokens
    } else if token.prone {
        blocking.prone_tokens
    } else {
        blocking.live_tokens
    }
}

/// Finds the objects that may block the view from `viewer` to `target`.
pub fn find_blocking_objects<'a, Q: SpatialQuery + ?Sized>(
    viewer: &Viewer,
    target: &Target,
    vision_polygon: &VisionPolygon,
    scene: &'a Q,
    config: &LosConfig,
) -> BlockingObjects<'a> {
    let sense = query_sense(viewer, config);
    let blocking = config.blocking.for_sense(sense);
    let (zmin, zmax) = elevation_range(viewer, target);
    let viewer_xy = viewer.point.to_2d();
    let candidates = scene.query_bounds(&vision_polygon.bounds());

    let mut objects = BlockingObjects::default();

    if blocking.walls {
        for wall in candidates.walls {
            let restriction = wall.sense(sense);
            if restriction == WallSenseType::None
                || wall.length() < EPS
                || wall.top_z() <= zmin
                || wall.bottom_z() >= zmax
                || !wall.blocks_from(viewer_xy)
                || !vision_polygon.intersects_segment(wall.a, wall.b)
            {
                continue;
            }
            match restriction {
                WallSenseType::Limited => objects.terrain_walls.push(wall),
                _ => objects.walls.push(wall),
            }
        }
    }

    if blocking.tiles {
        for tile in candidates.tiles {
            if tile.elevation <= zmin || tile.elevation >= zmax {
                continue;
            }
            if let Ok(footprint) = tile.footprint()
                && vision_polygon.intersects_polygon(&footprint)
            {
                objects.tiles.push(tile);
            }
        }
    }

    let is_excluded = |token: &Token| {
        viewer.uid.as_ref().is_some_and(|uid| uid == &token.uid)
            || target.uid.as_ref().is_some_and(|uid| uid == &token.uid)
    };
    for token in candidates.tokens {
        if is_excluded(token)
            || !token_enabled(token, blocking)
            || token.top_z <= zmin
            || token.bottom_z >= zmax
            || !vision_polygon.intersects_polygon(&token.footprint)
        {
            continue;
        }
        objects.tokens.push(token);
    }

    if !objects.tiles.is_empty() {
        objects.drawings = candidates
            .drawings
            .into_iter()
            .filter(|d| d.hole && objects.tiles.iter().any(|t| (t.elevation - d.elevation).abs() < EPS))
            .collect();
    }

    if let Some(vision) = viewer.vision.as_ref()
        && vision.is_limited()
    {
        objects.cone_walls = vision_cone_walls(viewer_xy, vision, target);
    }

    if config.debug {
        debug!(
            "Blocking objects: {} walls, {} terrain walls, {} cone walls, {} tiles, {} tokens, {} holes",
            objects.walls.len(),
            objects.terrain_walls.len(),
            objects.cone_walls.len(),
            objects.tiles.len(),
            objects.tokens.len(),
            objects.drawings.len()
        );
    }

    objects
}

/// Two chord walls closing the directions outside the vision cone.
///
/// The chords run from each cone boundary to the point opposite the cone axis,
/// at a radius short of the target so that they always sit in front of it.
pub fn vision_cone_walls(origin: Point2D, vision: &VisionConfig, target: &Target) -> Vec<Wall> {
    let radius = (0.5 * target.footprint().distance_to(origin)).max(1.);
    let (b1, b2) = vision.boundaries();
    let back = origin + vision.axis() * -radius;
    let p1 = origin + b1 * radius;
    let p2 = origin + b2 * radius;
    vec![
        Wall::new(p1, back).with_uid("vision-cone-1"),
        Wall::new(back, p2).with_uid("vision-cone-2"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use crate::scene::{Scene, WallDirection};

    fn setup() -> (Viewer, Target) {
        let viewer = Viewer::at(Point::new(0., 0., 0.));
        let target = Target::new(Polygon2D::rectangle(250., -50., 100., 100.).unwrap(), 0., 100.).unwrap();
        (viewer, target)
    }

    fn classify<'a>(viewer: &Viewer, target: &Target, scene: &'a Scene, config: &LosConfig) -> BlockingObjects<'a> {
        let vp = VisionPolygon::new(viewer.point.to_2d(), target.footprint()).unwrap();
        find_blocking_objects(viewer, target, &vp, scene, config)
    }

    #[test]
    fn test_vision_polygon() -> Result<()> {
        let (viewer, target) = setup();
        let vp = VisionPolygon::new(viewer.point.to_2d(), target.footprint())?;
        // Viewer plus the two far corners and the near corners
        assert!(vp.contains(Point2D::new(150., 0.)));
        assert!(vp.contains(Point2D::new(0., 0.)));
        assert!(!vp.contains(Point2D::new(150., 60.)));
        Ok(())
    }

    #[test]
    fn test_walls_split_by_restriction() {
        let (viewer, target) = setup();
        let mut scene = Scene::new();
        scene.walls.push(Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)));
        scene.walls.push(
            Wall::new(Point2D::new(100., -50.), Point2D::new(100., 50.)).with_restriction(WallSenseType::Limited),
        );
        scene.walls.push(
            Wall::new(Point2D::new(120., -50.), Point2D::new(120., 50.)).with_restriction(WallSenseType::None),
        );
        // Outside the vision polygon
        scene.walls.push(Wall::new(Point2D::new(150., 100.), Point2D::new(150., 200.)));

        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert_eq!(objects.walls.len(), 1);
        assert_eq!(objects.terrain_walls.len(), 1);
        assert!(!objects.is_empty());
        assert!(objects.cone_walls.is_empty());
    }

    #[test]
    fn test_single_terrain_wall_is_empty() {
        let (viewer, target) = setup();
        let mut scene = Scene::new();
        scene.walls.push(
            Wall::new(Point2D::new(100., -50.), Point2D::new(100., 50.)).with_restriction(WallSenseType::Limited),
        );
        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert!(objects.is_empty());
    }

    #[test]
    fn test_elevation_pruning() {
        let (viewer, target) = setup();
        let mut scene = Scene::new();
        // Entirely above the viewer and the target
        scene.walls.push(
            Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)).with_elevation(Some(150.), Some(200.)),
        );
        // Tile at the target's floor cannot block
        scene.tiles.push(Tile::new(100., -50., 100., 100., 0.));
        // Tile between the viewer and the target top
        scene.tiles.push(Tile::new(100., -50., 100., 100., 50.));
        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert!(objects.walls.is_empty());
        assert_eq!(objects.tiles.len(), 1);
    }

    #[test]
    fn test_one_directional_walls() {
        let (viewer, target) = setup();
        let mut scene = Scene::new();
        // Going north, the viewer at the origin is on the left
        scene.walls.push(
            Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)).with_direction(WallDirection::Left),
        );
        scene.walls.push(
            Wall::new(Point2D::new(160., -50.), Point2D::new(160., 50.)).with_direction(WallDirection::Right),
        );
        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert_eq!(objects.walls.len(), 1);
        assert_eq!(objects.walls[0].a.x, 150.);
    }

    #[test]
    fn test_tokens_filtered() -> Result<()> {
        let (mut viewer, mut target) = setup();
        let mut scene = Scene::new();
        let me = Token::centered(0., 0., 50., 0., 100.)?.with_uid("viewer");
        let them = Token::centered(300., 0., 100., 0., 100.)?.with_uid("target");
        let mut dead = Token::centered(150., 0., 50., 0., 30.)?.with_uid("dead");
        dead.dead = true;
        let live = Token::centered(150., 20., 50., 0., 100.)?.with_uid("live");
        viewer.uid = Some(me.uid.clone());
        target.uid = Some(them.uid.clone());
        scene.tokens.extend([me, them, dead, live]);

        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert_eq!(objects.tokens.len(), 1);
        assert_eq!(objects.tokens[0].uid.as_str(), "live");

        let mut config = LosConfig::new();
        config.blocking.sight.dead_tokens = true;
        config.blocking.sight.live_tokens = false;
        let objects = classify(&viewer, &target, &scene, &config);
        assert_eq!(objects.tokens.len(), 1);
        assert_eq!(objects.tokens[0].uid.as_str(), "dead");
        Ok(())
    }

    #[test]
    fn test_tile_holes_kept_with_tiles() -> Result<()> {
        let (viewer, target) = setup();
        let mut scene = Scene::new();
        scene.tiles.push(Tile::new(100., -50., 100., 100., 50.));
        scene.drawings.push(Drawing::hole(Polygon2D::rectangle(120., -10., 20., 20.)?, 50.));
        scene.drawings.push(Drawing::hole(Polygon2D::rectangle(120., -10., 20., 20.)?, 20.));
        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert_eq!(objects.drawings.len(), 1);
        Ok(())
    }

    #[test]
    fn test_cone_walls() {
        let (viewer, target) = setup();
        let viewer = viewer.with_vision(VisionConfig::cone(90., 0.));
        let scene = Scene::new();
        let objects = classify(&viewer, &target, &scene, &LosConfig::new());
        assert_eq!(objects.cone_walls.len(), 2);
        assert!(objects.is_empty());

        // Chords end at the point opposite the axis, 125 units away
        let back = objects.cone_walls[0].b;
        assert!(back.is_close(&Point2D::new(-125., 0.)));
        assert!(objects.cone_walls[1].a.is_close(&back));
    }
}
