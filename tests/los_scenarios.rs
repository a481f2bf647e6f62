use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visibility3d::los::context::ComputationContext;
use visibility3d::los::decision::{finalize_percent, los_from_percent};
use visibility3d::los::{geometric, raster};
use visibility3d::scene::{Token, Wall, WallSenseType};
use visibility3d::{
    LosConfig, Point, Point2D, Polygon2D, Scene, Target, VisibilityAlgorithm, Viewer, has_los, percent_visible,
};

const ALGORITHMS: [VisibilityAlgorithm; 5] = [
    VisibilityAlgorithm::Points,
    VisibilityAlgorithm::Area2D,
    VisibilityAlgorithm::Area3DGeometric,
    VisibilityAlgorithm::Area3DRasterized,
    VisibilityAlgorithm::Hybrid,
];

fn origin_viewer() -> Viewer {
    Viewer::at(Point::new(0., 0., 0.))
}

/// One grid cell centred at (300, 0), 100 high.
fn cell_target() -> Target {
    Target::new(Polygon2D::rectangle(250., -50., 100., 100.).unwrap(), 0., 100.).unwrap()
}

fn covering_wall() -> Wall {
    Wall::new(Point2D::new(150., -50.), Point2D::new(150., 50.)).with_elevation(Some(-50.), Some(150.))
}

fn random_wall(rng: &mut StdRng) -> Wall {
    let x = rng.gen_range(60.0..200.0);
    let y0 = rng.gen_range(-80.0..60.0);
    let len = rng.gen_range(5.0..60.0);
    let top = rng.gen_range(10.0..150.0);
    Wall::new(Point2D::new(x, y0), Point2D::new(x + rng.gen_range(-20.0..20.0), y0 + len))
        .with_elevation(Some(-10.), Some(top))
}

#[test]
fn test_bounds_random_scenes() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let mut scene = Scene::new();
        for _ in 0..rng.gen_range(0..5) {
            scene.walls.push(random_wall(&mut rng));
        }
        if rng.gen_bool(0.5) {
            scene
                .tokens
                .push(Token::centered(rng.gen_range(80.0..220.0), rng.gen_range(-40.0..40.0), 20., 0., 60.)?);
        }
        let viewer = Viewer::at(Point::new(0., rng.gen_range(-30.0..30.0), rng.gen_range(0.0..150.0)));
        for algorithm in ALGORITHMS {
            let config = LosConfig::new().with_algorithm(algorithm);
            let p = percent_visible(&viewer, &cell_target(), &scene, &config)?;
            assert!((0. ..=1.).contains(&p), "{algorithm:?} gave {p}");
        }
    }
    Ok(())
}

#[test]
fn test_no_occluders_is_fully_visible() -> Result<()> {
    let viewers = [Point::new(0., 0., 0.), Point::new(-100., 300., 500.), Point::new(300., -400., -20.)];
    for eye in viewers {
        for algorithm in ALGORITHMS {
            let config = LosConfig::new().with_algorithm(algorithm);
            assert_eq!(percent_visible(&Viewer::at(eye), &cell_target(), &Scene::new(), &config)?, 1.);
        }
    }
    Ok(())
}

#[test]
fn test_full_occlusion_floor() -> Result<()> {
    let mut scene = Scene::new();
    scene.walls.push(covering_wall());
    for algorithm in ALGORITHMS {
        let config = LosConfig::new().with_algorithm(algorithm);
        assert_eq!(percent_visible(&origin_viewer(), &cell_target(), &scene, &config)?, 0., "{algorithm:?}");
    }
    Ok(())
}

#[test]
fn test_adding_occluders_never_increases_visibility() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    for algorithm in [VisibilityAlgorithm::Area3DGeometric, VisibilityAlgorithm::Area3DRasterized] {
        let config = LosConfig::new().with_algorithm(algorithm);
        let mut scene = Scene::new();
        let mut previous = 1.;
        for _ in 0..6 {
            scene.walls.push(random_wall(&mut rng));
            let p = percent_visible(&origin_viewer(), &cell_target(), &scene, &config)?;
            assert!(p <= previous + 1e-6, "{algorithm:?}: {p} after {previous}");
            previous = p;
        }
    }
    Ok(())
}

#[test]
fn test_single_terrain_wall_does_not_block() -> Result<()> {
    let terrain = |x: f64| {
        Wall::new(Point2D::new(x, -50.), Point2D::new(x, 50.)).with_restriction(WallSenseType::Limited)
    };
    for algorithm in ALGORITHMS {
        let config = LosConfig::new().with_algorithm(algorithm);
        let mut scene = Scene::new();
        scene.walls.push(terrain(150.));
        assert_eq!(percent_visible(&origin_viewer(), &cell_target(), &scene, &config)?, 1.);
        scene.walls.push(terrain(120.));
        assert!(percent_visible(&origin_viewer(), &cell_target(), &scene, &config)? < 1.);
    }
    Ok(())
}

#[test]
fn test_threshold_boundary() -> Result<()> {
    assert!(los_from_percent(0.5, 0.5));
    // Viewer inside the target short-circuits to full visibility
    let inside = Viewer::at(Point::new(300., 0., 50.));
    assert!(has_los(&inside, &cell_target(), &Scene::new(), &LosConfig::new(), 0.)?);

    let mut scene = Scene::new();
    scene.walls.push(Wall::new(Point2D::new(150., 0.), Point2D::new(150., 100.)));
    let config = LosConfig::new();
    let p = percent_visible(&origin_viewer(), &cell_target(), &scene, &config)?;
    assert!(has_los(&origin_viewer(), &cell_target(), &scene, &config, p)?);
    Ok(())
}

#[test]
fn test_large_target_cap() -> Result<()> {
    // Viewer straight above: only top faces count
    let viewer = origin_viewer();
    let above = Viewer::at(Point::new(300., 0., 500.));
    let big = Target::new(Polygon2D::rectangle(200., -100., 200., 200.)?, 0., 100.)?;
    let mut config = LosConfig::new();
    config.large_target = true;
    let scene = Scene::new();
    let cell = cell_target();

    let solvers: [fn(&ComputationContext<'_, Scene>) -> Result<f64>; 2] =
        [geometric::percent_visible, raster::solver::percent_visible];
    for solver in solvers {
        let big_ctx = ComputationContext::new(&above, &big, &scene, &config);
        let small_ctx = ComputationContext::new(&above, &cell, &scene, &config);
        let capped = finalize_percent(solver(&big_ctx)?);
        let single = finalize_percent(solver(&small_ctx)?);
        assert_eq!(capped, single);
    }

    // A wall hiding half of the big target still leaves more than a cell visible
    let mut walled = Scene::new();
    walled.walls.push(Wall::new(Point2D::new(150., 0.), Point2D::new(150., 300.)));
    let uncapped = percent_visible(&viewer, &big, &walled, &LosConfig::new())?;
    let capped = percent_visible(&viewer, &big, &walled, &config)?;
    assert!(uncapped < 0.9);
    assert_eq!(capped, 1.);
    Ok(())
}

#[test]
fn test_geometric_and_raster_agree() -> Result<()> {
    let mut scenes = Vec::new();

    let mut half = Scene::new();
    half.walls.push(Wall::new(Point2D::new(150., 0.), Point2D::new(150., 100.)));
    scenes.push(half);

    let mut token = Scene::new();
    token.tokens.push(Token::centered(150., 10., 30., 0., 60.)?);
    scenes.push(token);

    let mut mixed = Scene::new();
    mixed
        .walls
        .push(Wall::new(Point2D::new(120., -40.), Point2D::new(180., -10.)).with_elevation(None, Some(70.)));
    mixed.tokens.push(Token::centered(200., 15., 20., 0., 40.)?);
    scenes.push(mixed);

    let geometric = LosConfig::new().with_algorithm(VisibilityAlgorithm::Area3DGeometric);
    let rasterized = LosConfig::new().with_algorithm(VisibilityAlgorithm::Area3DRasterized);
    for viewer in [origin_viewer(), Viewer::at(Point::new(0., 20., 120.))] {
        for scene in scenes.iter() {
            let g = percent_visible(&viewer, &cell_target(), scene, &geometric)?;
            let r = percent_visible(&viewer, &cell_target(), scene, &rasterized)?;
            assert!((g - r).abs() < 0.02, "geometric {g} vs rasterized {r}");
        }
    }
    Ok(())
}

#[test]
fn test_open_field_scenario() -> Result<()> {
    let config = LosConfig::new();
    assert_eq!(percent_visible(&origin_viewer(), &cell_target(), &Scene::new(), &config)?, 1.);
    assert!(has_los(&origin_viewer(), &cell_target(), &Scene::new(), &config, 0.5)?);
    Ok(())
}

#[test]
fn test_wall_scenario() -> Result<()> {
    let mut scene = Scene::new();
    scene.walls.push(covering_wall());
    let config = LosConfig::new();
    assert!(percent_visible(&origin_viewer(), &cell_target(), &scene, &config)? < 0.005);
    assert!(!has_los(&origin_viewer(), &cell_target(), &scene, &config, 0.)?);
    Ok(())
}

#[test]
fn test_missing_vision_fails() {
    let blind = Viewer::new(Point::new(0., 0., 0.));
    assert!(percent_visible(&blind, &cell_target(), &Scene::new(), &LosConfig::new()).is_err());
}
