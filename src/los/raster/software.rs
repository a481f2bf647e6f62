//! Scanline rasterizer on the CPU.

use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::los::raster::{BlendMode, Channel, RasterBuffer, Rasterizer};
use ndarray as nd;

/// Even-odd scanline fill sampled at pixel centres.
///
/// A pixel centre lying exactly on a polygon edge is filled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRasterizer;

impl SoftwareRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Filled column spans `[first, last]` of one row.
    fn row_spans(polygon: &Polygon2D, buffer: &RasterBuffer, row: usize) -> Vec<(usize, usize)> {
        let y = buffer.pixel_center(row, 0).y;
        let mut xs: Vec<f64> = polygon
            .edges()
            .filter(|(a, b)| (a.y > y) != (b.y > y))
            .map(|(a, b)| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
            .collect();
        xs.sort_by(|a, b| a.total_cmp(b));

        let x0 = buffer.bounds().min.x;
        let size = buffer.pixel_size();
        let last_col = buffer.width() as f64 - 1.;
        xs.chunks_exact(2)
            .filter_map(|pair| {
                let first = ((pair[0] - x0) / size - 0.5).ceil().max(0.);
                let last = ((pair[1] - x0) / size - 0.5).floor().min(last_col);
                (first <= last).then_some((first as usize, last as usize))
            })
            .collect()
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn render_masked(
        &self,
        buffer: &mut RasterBuffer,
        polygons: &[Polygon2D],
        blend: BlendMode,
        channel: Channel,
        mask: &dyn Fn(Point2D) -> bool,
    ) {
        let ch = channel.index();
        let top = buffer.bounds().max.y;
        let size = buffer.pixel_size();
        let rows = buffer.height();
        for polygon in polygons {
            let bounds = polygon.bounds();
            // Only rows whose centres fall inside the polygon's vertical extent
            let first_row = ((top - bounds.max.y) / size - 0.5).ceil().max(0.) as usize;
            let last_row = ((top - bounds.min.y) / size - 0.5).floor();
            if last_row < 0. {
                continue;
            }
            let last_row = (last_row as usize).min(rows.saturating_sub(1));
            for row in first_row..=last_row {
                for (c0, c1) in Self::row_spans(polygon, buffer, row) {
                    for col in c0..=c1 {
                        if mask(buffer.pixel_center(row, col)) {
                            let px = &mut buffer.data[[row, col, ch]];
                            *px = blend.apply(*px);
                        }
                    }
                }
            }
        }
    }

    fn count(&self, buffer: &RasterBuffer, predicate: &dyn Fn([f32; 4]) -> bool) -> usize {
        buffer
            .data
            .lanes(nd::Axis(2))
            .into_iter()
            .filter(|px| predicate([px[0], px[1], px[2], px[3]]))
            .count()
    }
}
