//! Pixel-counting estimate of the visible area.
//!
//! The target and the occluders are drawn into an RGBA buffer covering the
//! projected target. Channels:
//! - red: visible target faces, erased by occluders
//! - green: all target faces (the denominator)
//! - blue: terrain wall accumulation
//! - alpha: one grid cell, used to cap large targets

pub mod software;
pub mod solver;

use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use anyhow::{Result, bail};
use ndarray as nd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub fn index(&self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }
}

/// How a drawn polygon combines with the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendMode {
    /// Overwrite with the value
    Replace(f32),
    /// Add the value
    Additive(f32),
    /// Scale the destination by `1 - alpha`
    DestinationOut(f32),
}

impl BlendMode {
    pub fn apply(&self, dst: f32) -> f32 {
        match *self {
            BlendMode::Replace(v) => v,
            BlendMode::Additive(v) => dst + v,
            BlendMode::DestinationOut(alpha) => dst * (1. - alpha),
        }
    }
}

/// Off-screen RGBA buffer over a rectangle of the view plane.
///
/// Row 0 is the top of the rectangle.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    pub data: nd::Array3<f32>,
    bounds: BoundingBox2D,
    pixel_size: f64,
}

impl RasterBuffer {
    /// Buffer with `resolution` pixels along the long side of `bounds`.
    pub fn new(bounds: BoundingBox2D, resolution: usize) -> Result<Self> {
        let long_side = bounds.width().max(bounds.height());
        if !(long_side > 0.) || resolution == 0 {
            bail!("Cannot rasterize an empty area");
        }
        let pixel_size = long_side / resolution as f64;
        let width = ((bounds.width() / pixel_size).ceil() as usize).max(1);
        let height = ((bounds.height() / pixel_size).ceil() as usize).max(1);
        Ok(Self {
            data: nd::Array3::zeros((height, width, 4)),
            bounds,
            pixel_size,
        })
    }

    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn bounds(&self) -> &BoundingBox2D {
        &self.bounds
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// View-plane coordinates of a pixel centre.
    pub fn pixel_center(&self, row: usize, col: usize) -> Point2D {
        Point2D::new(
            self.bounds.min.x + (col as f64 + 0.5) * self.pixel_size,
            self.bounds.max.y - (row as f64 + 0.5) * self.pixel_size,
        )
    }
}

/// Draws projected polygons into a buffer and counts pixels.
pub trait Rasterizer {
    /// Blends every pixel whose centre lies in a polygon and passes `mask`.
    fn render_masked(
        &self,
        buffer: &mut RasterBuffer,
        polygons: &[Polygon2D],
        blend: BlendMode,
        channel: Channel,
        mask: &dyn Fn(Point2D) -> bool,
    );

    fn render(&self, buffer: &mut RasterBuffer, polygons: &[Polygon2D], blend: BlendMode, channel: Channel) {
        self.render_masked(buffer, polygons, blend, channel, &|_| true);
    }

    /// Number of pixels whose RGBA value satisfies `predicate`.
    fn count(&self, buffer: &RasterBuffer, predicate: &dyn Fn([f32; 4]) -> bool) -> usize;
}
