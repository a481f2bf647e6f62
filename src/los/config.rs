use crate::scene::SenseType;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Method used to measure how much of the target is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityAlgorithm {
    /// Ray tests to sample points on the target
    Points,
    /// Top-down shadows cast on the target footprint
    #[serde(rename = "area2d")]
    Area2D,
    /// Exact polygon booleans in the viewer's perspective
    #[default]
    #[serde(rename = "area3d_geometric")]
    Area3DGeometric,
    /// Pixel counting in the viewer's perspective
    #[serde(rename = "area3d_rasterized")]
    Area3DRasterized,
    /// Rasterized when tiles are involved, geometric otherwise
    Hybrid,
}

/// Object categories that block one sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    pub walls: bool,
    pub tiles: bool,
    pub live_tokens: bool,
    pub dead_tokens: bool,
    pub prone_tokens: bool,
}

impl BlockingConfig {
    pub fn new() -> Self {
        Self {
            walls: true,
            tiles: true,
            live_tokens: true,
            dead_tokens: false,
            prone_tokens: false,
        }
    }

    /// Only walls block.
    pub fn walls_only() -> Self {
        Self {
            walls: true,
            tiles: false,
            live_tokens: false,
            dead_tokens: false,
            prone_tokens: false,
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking toggles per sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenseBlocking {
    pub sight: BlockingConfig,
    pub light: BlockingConfig,
    pub sound: BlockingConfig,
}

impl SenseBlocking {
    pub fn for_sense(&self, sense: SenseType) -> &BlockingConfig {
        match sense {
            SenseType::Sight => &self.sight,
            SenseType::Light => &self.light,
            SenseType::Sound => &self.sound,
        }
    }
}

impl Default for SenseBlocking {
    fn default() -> Self {
        Self {
            sight: BlockingConfig::new(),
            light: BlockingConfig::new(),
            // Tokens do not muffle sound
            sound: BlockingConfig::walls_only(),
        }
    }
}

/// Configuration for a line-of-sight query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosConfig {
    pub algorithm: VisibilityAlgorithm,
    /// Cap the denominator at one grid cell for targets larger than a cell.
    pub large_target: bool,
    /// Side of one grid cell in scene units.
    pub grid_size: f64,
    pub blocking: SenseBlocking,
    /// Sense used when the viewer does not name one.
    pub sense_type: SenseType,
    /// Pixels along the long side of the rasterized target.
    pub raster_resolution: usize,
    /// Distance of point samples from each face centre, as a fraction of the way to its corners.
    pub points_inset: f64,
    /// Elevation of the ground plane the viewer cannot see through.
    pub background_elevation: Option<f64>,
    /// Log intermediate geometry at debug level.
    pub debug: bool,
}

impl LosConfig {
    pub fn new() -> Self {
        Self {
            algorithm: VisibilityAlgorithm::default(),
            large_target: false,
            grid_size: 100.,
            blocking: SenseBlocking::default(),
            sense_type: SenseType::Sight,
            raster_resolution: 256,
            points_inset: 0.75,
            background_elevation: None,
            debug: false,
        }
    }

    pub fn with_algorithm(mut self, algorithm: VisibilityAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Fails on values no query can work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_size > 0.) {
            bail!("Grid size must be positive, got {}", self.grid_size);
        }
        if self.raster_resolution < 8 {
            bail!("Raster resolution must be at least 8, got {}", self.raster_resolution);
        }
        if !(0. ..=1.).contains(&self.points_inset) {
            bail!("Points inset must be in [0, 1], got {}", self.points_inset);
        }
        if self.background_elevation.is_some_and(|z| !z.is_finite()) {
            bail!("Background elevation must be finite");
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to deserialize config from: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for LosConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = LosConfig::new();
        assert_eq!(config.algorithm, VisibilityAlgorithm::Area3DGeometric);
        assert_eq!(config.grid_size, 100.);
        assert!(config.blocking.for_sense(SenseType::Sight).walls);
        assert!(!config.blocking.for_sense(SenseType::Sound).live_tokens);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LosConfig::new();
        config.grid_size = 0.;
        assert!(config.validate().is_err());

        let mut config = LosConfig::new();
        config.raster_resolution = 1;
        assert!(config.validate().is_err());

        let mut config = LosConfig::new();
        config.points_inset = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_partial() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("los.json");
        let mut file = File::create(&path)?;
        write!(
            file,
            r#"{{"algorithm": "hybrid", "large_target": true, "blocking": {{"sight": {{"tiles": false}}}}}}"#
        )?;
        drop(file);

        let config = LosConfig::from_json_file(&path)?;
        assert_eq!(config.algorithm, VisibilityAlgorithm::Hybrid);
        assert!(config.large_target);
        assert!(!config.blocking.sight.tiles);
        assert!(config.blocking.sight.walls);
        assert_eq!(config.raster_resolution, 256);
        Ok(())
    }

    #[test]
    fn test_from_json_file_invalid() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("los.json");
        std::fs::write(&path, r#"{"grid_size": -1}"#)?;
        assert!(LosConfig::from_json_file(&path).is_err());
        Ok(())
    }
}
