//! JSON scene files.

use crate::scene::Scene;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes a scene to a JSON file.
pub fn write_scene(path: &Path, scene: &Scene) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, scene)
        .with_context(|| format!("Failed to serialize scene to: {}", path.display()))?;

    Ok(())
}

/// Reads a scene from a JSON file.
///
/// Objects without a `uid` get a random one.
pub fn read_scene(path: &Path) -> Result<Scene> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let scene: Scene = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize scene from: {}", path.display()))?;

    Ok(scene)
}

pub fn scene_from_str(json: &str) -> Result<Scene> {
    serde_json::from_str(json).context("Failed to deserialize scene from string")
}
