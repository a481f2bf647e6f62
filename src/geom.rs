pub mod bboxes;
pub mod point;
pub mod point2d;
pub mod polygon2d;
pub mod projection;
pub mod ray;
pub mod segment;
pub mod vector;

/// Geometric precision
pub const EPS: f64 = 1e-10;

/// Approximate comparison of scalars using the crate-wide precision.
pub trait IsClose {
    fn is_close(&self, other: f64) -> bool;
}

impl IsClose for f64 {
    fn is_close(&self, other: f64) -> bool {
        (self - other).abs() < EPS
    }
}
