//! Scene objects consumed by the line-of-sight engine.
//!
//! The host application owns these objects. The engine only reads them through
//! [`SpatialQuery`], which [`Scene`] implements with a linear scan.

pub mod io;

use crate::Point;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::{Point2D, orient2d};
use crate::geom::polygon2d::Polygon2D;
use crate::los::viewer::VisionConfig;
use crate::uid::UID;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Elevation substituted for unbounded wall bottoms and tops.
pub const ELEVATION_SENTINEL: f64 = 1e5;

/// Sense through which the viewer perceives the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenseType {
    #[default]
    Sight,
    Light,
    Sound,
}

/// How strongly a wall restricts one sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallSenseType {
    /// Does not restrict
    None,
    /// Terrain wall: only restricts where two or more overlap
    Limited,
    #[default]
    Normal,
}

/// Side of a wall from which it blocks.
///
/// `Left` and `Right` are relative to the direction a->b.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallDirection {
    #[default]
    Both,
    Left,
    Right,
}

/// Kind of object a plane was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccluderKind {
    Wall,
    TerrainWall,
    VisionCone,
    Tile,
    Token,
    Target,
}

/// Back-reference from a derived plane to its source object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccluderRef {
    pub kind: OccluderKind,
    pub uid: UID,
}

impl OccluderRef {
    pub fn new(kind: OccluderKind, uid: &UID) -> Self {
        Self { kind, uid: uid.clone() }
    }
}

/// Vertical wall segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(default)]
    pub uid: UID,
    pub a: Point2D,
    pub b: Point2D,
    /// Unbounded below when `None`
    #[serde(default)]
    pub bottom: Option<f64>,
    /// Unbounded above when `None`
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub sight: WallSenseType,
    #[serde(default)]
    pub light: WallSenseType,
    #[serde(default)]
    pub sound: WallSenseType,
    #[serde(default)]
    pub direction: WallDirection,
}

impl Wall {
    /// Infinite-height wall restricting every sense.
    pub fn new(a: Point2D, b: Point2D) -> Self {
        Self {
            uid: UID::new(),
            a,
            b,
            bottom: None,
            top: None,
            sight: WallSenseType::Normal,
            light: WallSenseType::Normal,
            sound: WallSenseType::Normal,
            direction: WallDirection::Both,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<UID>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_elevation(mut self, bottom: Option<f64>, top: Option<f64>) -> Self {
        self.bottom = bottom;
        self.top = top;
        self
    }

    /// Uses the same restriction for all senses.
    pub fn with_restriction(mut self, restriction: WallSenseType) -> Self {
        self.sight = restriction;
        self.light = restriction;
        self.sound = restriction;
        self
    }

    pub fn with_direction(mut self, direction: WallDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn sense(&self, sense: SenseType) -> WallSenseType {
        match sense {
            SenseType::Sight => self.sight,
            SenseType::Light => self.light,
            SenseType::Sound => self.sound,
        }
    }

    pub fn bottom_z(&self) -> f64 {
        self.bottom.unwrap_or(-ELEVATION_SENTINEL)
    }

    pub fn top_z(&self) -> f64 {
        self.top.unwrap_or(ELEVATION_SENTINEL)
    }

    pub fn length(&self) -> f64 {
        self.a.distance(&self.b)
    }

    /// Checks if a one-directional wall blocks a viewer standing at `viewer`.
    ///
    /// A viewer on the wall's line counts as being on the blocking side.
    pub fn blocks_from(&self, viewer: Point2D) -> bool {
        let side = orient2d(self.a, self.b, viewer);
        match self.direction {
            WallDirection::Both => true,
            WallDirection::Left => side >= 0.,
            WallDirection::Right => side <= 0.,
        }
    }

    pub fn bounds(&self) -> BoundingBox2D {
        BoundingBox2D::new(
            Point2D::new(self.a.x.min(self.b.x), self.a.y.min(self.b.y)),
            Point2D::new(self.a.x.max(self.b.x), self.a.y.max(self.b.y)),
        )
    }
}

/// Per-pixel opacity of a tile texture, row-major from the tile's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl AlphaMask {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(anyhow!(
                "Alpha mask of {width}x{height} needs {} values, got {}",
                width * height,
                data.len()
            ));
        }
        Ok(Self { width, height, data })
    }

    /// Nearest-neighbour lookup at texture coordinates in `[0, 1]`.
    pub fn sample(&self, u: f64, v: f64) -> f32 {
        let col = ((u.clamp(0., 1.) * self.width as f64) as usize).min(self.width.saturating_sub(1));
        let row = ((v.clamp(0., 1.) * self.height as f64) as usize).min(self.height.saturating_sub(1));
        self.data.get(row * self.width + col).copied().unwrap_or(1.)
    }
}

fn default_alpha_threshold() -> f32 {
    0.75
}

/// Horizontal rectangle at a fixed elevation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(default)]
    pub uid: UID,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub elevation: f64,
    #[serde(default)]
    pub alpha: Option<AlphaMask>,
    /// Texels at or above this opacity block
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: f32,
}

impl Tile {
    pub fn new(x: f64, y: f64, width: f64, height: f64, elevation: f64) -> Self {
        Self {
            uid: UID::new(),
            x,
            y,
            width,
            height,
            elevation,
            alpha: None,
            alpha_threshold: default_alpha_threshold(),
        }
    }

    pub fn with_alpha(mut self, mask: AlphaMask, threshold: f32) -> Self {
        self.alpha = Some(mask);
        self.alpha_threshold = threshold;
        self
    }

    pub fn bounds(&self) -> BoundingBox2D {
        BoundingBox2D::new(
            Point2D::new(self.x, self.y),
            Point2D::new(self.x + self.width, self.y + self.height),
        )
    }

    pub fn footprint(&self) -> Result<Polygon2D> {
        Polygon2D::rectangle(self.x, self.y, self.width, self.height)
    }

    /// Texture coordinates of a ground point; `v` grows with `y`.
    pub fn uv(&self, pt: Point2D) -> (f64, f64) {
        ((pt.x - self.x) / self.width, (pt.y - self.y) / self.height)
    }

    /// Checks whether the tile blocks at a ground point inside it.
    pub fn is_opaque_at(&self, pt: Point2D) -> bool {
        match &self.alpha {
            None => true,
            Some(mask) => {
                let (u, v) = self.uv(pt);
                mask.sample(u, v) >= self.alpha_threshold
            }
        }
    }
}

/// Occupant extruded between two elevations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub uid: UID,
    pub footprint: Polygon2D,
    /// Footprint cut down by walls or lighting
    #[serde(default)]
    pub constrained_shape: Option<Polygon2D>,
    pub bottom_z: f64,
    pub top_z: f64,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub prone: bool,
    #[serde(default)]
    pub vision: Option<VisionConfig>,
}

impl Token {
    /// Rectangular token with its lower-left corner at (x, y).
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64, bottom_z: f64, top_z: f64) -> Result<Self> {
        Ok(Self {
            uid: UID::new(),
            footprint: Polygon2D::rectangle(x, y, width, height)?,
            constrained_shape: None,
            bottom_z,
            top_z,
            dead: false,
            prone: false,
            vision: None,
        })
    }

    /// Square token of `size` centred at (x, y).
    pub fn centered(x: f64, y: f64, size: f64, bottom_z: f64, top_z: f64) -> Result<Self> {
        Self::rectangle(x - size / 2., y - size / 2., size, size, bottom_z, top_z)
    }

    pub fn with_uid(mut self, uid: impl Into<UID>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_vision(mut self, vision: VisionConfig) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.footprint.bounds()
    }

    /// Footprint centroid at mid-height.
    pub fn center(&self) -> Point {
        Point::from_2d(self.footprint.centroid(), 0.5 * (self.bottom_z + self.top_z))
    }
}

/// Drawn shape; holes cut openings into tiles at the same elevation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    #[serde(default)]
    pub uid: UID,
    pub shape: Polygon2D,
    pub elevation: f64,
    #[serde(default)]
    pub hole: bool,
}

impl Drawing {
    pub fn hole(shape: Polygon2D, elevation: f64) -> Self {
        Self {
            uid: UID::new(),
            shape,
            elevation,
            hole: true,
        }
    }
}

/// Objects whose bounds intersect a query area.
#[derive(Debug, Default)]
pub struct QueryResult<'a> {
    pub walls: Vec<&'a Wall>,
    pub tiles: Vec<&'a Tile>,
    pub tokens: Vec<&'a Token>,
    pub drawings: Vec<&'a Drawing>,
}

/// Spatial index over the host scene.
pub trait SpatialQuery {
    /// Returns every object whose bounding box overlaps `bounds` (touching counts).
    fn query_bounds(&self, bounds: &BoundingBox2D) -> QueryResult<'_>;
}

/// Plain in-memory scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialQuery for Scene {
    fn query_bounds(&self, bounds: &BoundingBox2D) -> QueryResult<'_> {
        QueryResult {
            walls: self.walls.iter().filter(|w| w.bounds().overlaps(bounds)).collect(),
            tiles: self.tiles.iter().filter(|t| t.bounds().overlaps(bounds)).collect(),
            tokens: self.tokens.iter().filter(|t| t.bounds().overlaps(bounds)).collect(),
            drawings: self
                .drawings
                .iter()
                .filter(|d| d.shape.bounds().overlaps(bounds))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_sentinels() {
        let w = Wall::new(Point2D::new(0., 0.), Point2D::new(1., 0.));
        assert_eq!(w.bottom_z(), -ELEVATION_SENTINEL);
        assert_eq!(w.top_z(), ELEVATION_SENTINEL);
        let w = w.with_elevation(Some(0.), Some(10.));
        assert_eq!(w.bottom_z(), 0.);
        assert_eq!(w.top_z(), 10.);
    }

    #[test]
    fn test_wall_direction() {
        let w = Wall::new(Point2D::new(0., 0.), Point2D::new(10., 0.)).with_direction(WallDirection::Left);
        assert!(w.blocks_from(Point2D::new(5., 5.)));
        assert!(!w.blocks_from(Point2D::new(5., -5.)));
        let w = w.with_direction(WallDirection::Right);
        assert!(w.blocks_from(Point2D::new(5., -5.)));
        assert!(w.with_direction(WallDirection::Both).blocks_from(Point2D::new(5., 5.)));
    }

    #[test]
    fn test_wall_sense() {
        let mut w = Wall::new(Point2D::new(0., 0.), Point2D::new(1., 0.));
        w.sound = WallSenseType::None;
        assert_eq!(w.sense(SenseType::Sight), WallSenseType::Normal);
        assert_eq!(w.sense(SenseType::Sound), WallSenseType::None);
    }

    #[test]
    fn test_tile_alpha() -> Result<()> {
        // Left half transparent, right half opaque
        let mask = AlphaMask::new(2, 1, vec![0., 1.])?;
        let tile = Tile::new(0., 0., 100., 100., 10.).with_alpha(mask, 0.5);
        assert!(!tile.is_opaque_at(Point2D::new(25., 50.)));
        assert!(tile.is_opaque_at(Point2D::new(75., 50.)));
        assert!(Tile::new(0., 0., 1., 1., 0.).is_opaque_at(Point2D::new(0.5, 0.5)));
        assert!(AlphaMask::new(2, 2, vec![1.]).is_err());
        Ok(())
    }

    #[test]
    fn test_query_bounds() -> Result<()> {
        let mut scene = Scene::new();
        scene.walls.push(Wall::new(Point2D::new(0., 0.), Point2D::new(10., 0.)));
        scene.walls.push(Wall::new(Point2D::new(100., 100.), Point2D::new(110., 100.)));
        scene.tokens.push(Token::centered(5., 5., 2., 0., 1.)?);
        scene.tiles.push(Tile::new(50., 50., 10., 10., 0.));

        let found = scene.query_bounds(&BoundingBox2D::new(Point2D::new(-1., -1.), Point2D::new(20., 20.)));
        assert_eq!(found.walls.len(), 1);
        assert_eq!(found.tokens.len(), 1);
        assert!(found.tiles.is_empty());
        Ok(())
    }

    #[test]
    fn test_token_center() -> Result<()> {
        let t = Token::centered(300., 0., 100., 0., 100.)?;
        assert!(t.center().is_close(&Point::new(300., 0., 50.)));
        Ok(())
    }
}
