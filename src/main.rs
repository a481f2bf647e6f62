use anyhow::Result;
use log::info;
use simplelog::TermLogger;
use std::path::Path;
use visibility3d::los::decision::los_from_percent;
use visibility3d::scene::Wall;
use visibility3d::scene::io::read_scene;
use visibility3d::{LosConfig, Point, Point2D, Polygon2D, Scene, Target, Viewer, percent_visible};

/// Threshold used for the printed line-of-sight decision.
const THRESHOLD: f64 = 0.;

fn main() -> Result<()> {
    TermLogger::init(
        log::LevelFilter::Info,
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = LosConfig::new();
    match std::env::args().nth(1) {
        Some(path) => token_pairs(Path::new(&path), &config),
        None => wall_scenario(&config),
    }
}

/// Every ordered pair of tokens in a scene file.
fn token_pairs(path: &Path, config: &LosConfig) -> Result<()> {
    let scene = read_scene(path)?;
    info!("Loaded {} walls, {} tiles, {} tokens", scene.walls.len(), scene.tiles.len(), scene.tokens.len());
    for viewer_token in scene.tokens.iter() {
        let viewer = Viewer::from_token(viewer_token);
        if viewer.vision.is_none() {
            info!("Token {} has no vision, skipping", viewer_token.uid);
            continue;
        }
        for target_token in scene.tokens.iter().filter(|t| t.uid != viewer_token.uid) {
            let target = Target::from_token(target_token)?;
            let percent = percent_visible(&viewer, &target, &scene, config)?;
            let los = los_from_percent(percent, THRESHOLD);
            println!("{} -> {}: {:.1}% visible, LOS: {los}", viewer_token.uid, target_token.uid, 100. * percent);
        }
    }
    Ok(())
}

/// Viewer at the origin, one grid cell target behind a wall covering it.
fn wall_scenario(config: &LosConfig) -> Result<()> {
    let viewer = Viewer::at(Point::new(0., 0., 0.));
    let target = Target::new(Polygon2D::rectangle(250., -50., 100., 100.)?, 0., 100.)?;
    let mut scene = Scene::new();
    println!("Open field: {:.3}", percent_visible(&viewer, &target, &scene, config)?);

    scene.walls.push(
        Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)).with_elevation(Some(-50.), Some(150.)),
    );
    println!("Behind a wall: {:.3}", percent_visible(&viewer, &target, &scene, config)?);
    Ok(())
}
