pub mod geom;
pub mod los;
pub mod scene;
pub mod uid;

// Prelude
pub use geom::point::Point;
pub use geom::point2d::Point2D;
pub use geom::polygon2d::Polygon2D;
pub use geom::vector::Vector;
pub use los::config::{LosConfig, VisibilityAlgorithm};
pub use los::decision::{has_los, percent_visible, percent_visible_batch};
pub use los::target::Target;
pub use los::viewer::{Viewer, VisionConfig};
pub use scene::{Scene, SpatialQuery};
pub use uid::UID;
