//! Line of sight between a viewer and a target in a scene.
//!
//! A query builds a [`context::ComputationContext`], runs the quick pre-tests
//! and then one of the solvers picked by [`config::VisibilityAlgorithm`].

pub mod area2d;
pub mod classify;
pub mod config;
pub mod context;
pub mod decision;
pub mod frustum;
pub mod geometric;
pub mod planes;
pub mod points;
pub mod raster;
pub mod target;
pub mod viewer;
