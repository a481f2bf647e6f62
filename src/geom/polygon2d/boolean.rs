//! Boolean operations on planar regions.
//!
//! A [`Region`] is stored as a set of disjoint convex pieces, which keeps
//! union, difference and intersection down to repeated half-plane clipping
//! (Sutherland-Hodgman). Non-convex input is triangulated first.
//!
//! Coordinates are multiplied by [`SCALING_FACTOR`] and snapped to the
//! resulting fixed-point grid before any clipping; areas are divided back down
//! by the square of the factor.

use crate::geom::point2d::Point2D;
use crate::geom::polygon2d::Polygon2D;
use crate::geom::polygon2d::triangulate::triangulate;
use anyhow::{Result, anyhow};

/// Fixed-point scaling applied before every boolean operation.
pub const SCALING_FACTOR: f64 = 1e6;

/// Pieces smaller than this (in scaled units squared) are dropped.
const MIN_PIECE_AREA: f64 = 1.0;

/// Half a fixed-point unit; points this close to a clip line count as on it.
const SNAP_TOLERANCE: f64 = 0.5;

type Piece = Vec<(f64, f64)>;

/// Planar point set stored as disjoint convex pieces in scaled coordinates.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pieces: Vec<Piece>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a region from a simple polygon.
    ///
    /// Rings that collapse to nothing when snapped give an empty region.
    /// Fails for self-intersecting rings.
    pub fn from_polygon(poly: &Polygon2D) -> Result<Self> {
        let snapped: Piece = poly
            .vertices()
            .iter()
            .map(|p| snap((p.x * SCALING_FACTOR, p.y * SCALING_FACTOR)))
            .collect();
        let snapped = remove_duplicates(snapped);
        if snapped.len() < 3 || unsigned_fan_area(&snapped) < MIN_PIECE_AREA {
            return Ok(Self::new());
        }
        let scaled = Polygon2D::new(snapped.iter().map(|&(x, y)| Point2D::new(x, y)).collect())?;
        if !scaled.is_simple() {
            return Err(anyhow!("Polygon is self-intersecting"));
        }

        let scaled = scaled.to_ccw();
        let pieces: Vec<Piece> = if scaled.is_convex() {
            vec![scaled.vertices().iter().map(|p| (p.x, p.y)).collect()]
        } else {
            triangulate(&scaled)?
                .iter()
                .map(|t| t.iter().map(|p| (p.x, p.y)).collect())
                .collect()
        };

        Ok(Self {
            pieces: pieces.into_iter().filter(|p| piece_area(p) >= MIN_PIECE_AREA).collect(),
        })
    }

    /// Union of several polygons. Fails on the first invalid polygon.
    pub fn from_polygons(polys: &[Polygon2D]) -> Result<Self> {
        let mut region = Self::new();
        for poly in polys {
            region = region.union(&Self::from_polygon(poly)?);
        }
        Ok(region)
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Number of convex pieces.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Convex pieces in unscaled coordinates.
    pub fn polygons(&self) -> Vec<Polygon2D> {
        self.pieces
            .iter()
            .filter_map(|piece| {
                let pts = piece
                    .iter()
                    .map(|&(x, y)| Point2D::new(x / SCALING_FACTOR, y / SCALING_FACTOR))
                    .collect();
                Polygon2D::new(pts).ok()
            })
            .collect()
    }

    /// Area in unscaled units.
    pub fn area(&self) -> f64 {
        self.pieces.iter().map(|p| piece_area(p)).sum::<f64>() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// Points covered by either region.
    pub fn union(&self, other: &Self) -> Self {
        let mut pieces = self.pieces.clone();
        pieces.extend(other.difference(self).pieces);
        Self { pieces }
    }

    /// Points of `self` not covered by `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut result: Vec<Piece> = Vec::new();
        for piece in self.pieces.iter() {
            let mut fragments = vec![piece.clone()];
            for hole in other.pieces.iter() {
                fragments = fragments
                    .iter()
                    .flat_map(|f| convex_difference(f, hole))
                    .collect();
                if fragments.is_empty() {
                    break;
                }
            }
            result.extend(fragments);
        }
        Self { pieces: result }
    }

    /// Points covered by both regions.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut pieces = Vec::new();
        for a in self.pieces.iter() {
            for b in other.pieces.iter() {
                if !piece_bounds_overlap(a, b) {
                    continue;
                }
                let clipped = sutherland_hodgman_2d(a, b);
                if clipped.len() >= 3 && piece_area(&clipped) >= MIN_PIECE_AREA {
                    pieces.push(clipped);
                }
            }
        }
        Self { pieces }
    }
}

/// Splits convex `subject` into the convex pieces lying outside convex `clip`.
fn convex_difference(subject: &Piece, clip: &Piece) -> Vec<Piece> {
    if !piece_bounds_overlap(subject, clip) {
        return vec![subject.clone()];
    }

    let mut remaining = subject.clone();
    let mut output = Vec::new();
    for i in 0..clip.len() {
        let edge_start = clip[i];
        let edge_end = clip[(i + 1) % clip.len()];

        // Part on the outer side of this edge is outside `clip` for good
        let outside = clip_half_plane(&remaining, edge_end, edge_start);
        if outside.len() >= 3 && piece_area(&outside) >= MIN_PIECE_AREA {
            output.push(outside);
        }
        remaining = clip_half_plane(&remaining, edge_start, edge_end);
        if remaining.len() < 3 || piece_area(&remaining) < MIN_PIECE_AREA {
            // Nothing of `subject` lies inside `clip`
            return output;
        }
    }
    // What remains is `subject` ∩ `clip` and is discarded
    output
}

/// 2D Sutherland-Hodgman polygon clipping algorithm.
fn sutherland_hodgman_2d(subject: &Piece, clip_poly: &Piece) -> Piece {
    let mut output = subject.clone();
    for i in 0..clip_poly.len() {
        if output.is_empty() {
            break;
        }
        let edge_start = clip_poly[i];
        let edge_end = clip_poly[(i + 1) % clip_poly.len()];
        output = clip_half_plane(&output, edge_start, edge_end);
    }
    output
}

/// Keeps the part of `input` on the left of edge_start->edge_end.
fn clip_half_plane(input: &Piece, edge_start: (f64, f64), edge_end: (f64, f64)) -> Piece {
    let mut output = Vec::with_capacity(input.len() + 1);
    for j in 0..input.len() {
        let current = input[j];
        let previous = input[(j + input.len() - 1) % input.len()];

        let curr_inside = is_inside_edge_2d(current, edge_start, edge_end);
        let prev_inside = is_inside_edge_2d(previous, edge_start, edge_end);

        if curr_inside {
            if !prev_inside
                && let Some(intersection) = line_intersection_2d(previous, current, edge_start, edge_end)
            {
                output.push(snap(intersection));
            }
            output.push(current);
        } else if prev_inside
            && let Some(intersection) = line_intersection_2d(previous, current, edge_start, edge_end)
        {
            output.push(snap(intersection));
        }
    }
    remove_duplicates(output)
}

/// Checks if a 2D point is on the inside of an edge (left side for CCW).
fn is_inside_edge_2d(point: (f64, f64), edge_start: (f64, f64), edge_end: (f64, f64)) -> bool {
    let edge_x = edge_end.0 - edge_start.0;
    let edge_y = edge_end.1 - edge_start.1;
    let to_point_x = point.0 - edge_start.0;
    let to_point_y = point.1 - edge_start.1;
    let cross_z = edge_x * to_point_y - edge_y * to_point_x;
    let edge_len = edge_x.hypot(edge_y);

    // Signed distance from the edge line, boundary counts as inside
    cross_z >= -SNAP_TOLERANCE * edge_len
}

/// Computes the intersection of segment (p1,p2) with the infinite line (p3,p4).
fn line_intersection_2d(
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    p4: (f64, f64),
) -> Option<(f64, f64)> {
    let d1x = p2.0 - p1.0;
    let d1y = p2.1 - p1.1;
    let d2x = p4.0 - p3.0;
    let d2y = p4.1 - p3.1;

    let cross = d1x * d2y - d1y * d2x;
    if cross.abs() < 1e-12 {
        return None; // Parallel
    }

    let d3x = p3.0 - p1.0;
    let d3y = p3.1 - p1.1;
    let t = ((d3x * d2y - d3y * d2x) / cross).clamp(0., 1.);

    Some((p1.0 + t * d1x, p1.1 + t * d1y))
}

fn snap(p: (f64, f64)) -> (f64, f64) {
    (p.0.round(), p.1.round())
}

fn is_close_2d(a: &(f64, f64), b: &(f64, f64)) -> bool {
    (a.0 - b.0).abs() < SNAP_TOLERANCE && (a.1 - b.1).abs() < SNAP_TOLERANCE
}

fn remove_duplicates(pts: Piece) -> Piece {
    let mut result: Piece = Vec::with_capacity(pts.len());
    for pt in pts {
        if result.last().is_none_or(|last| !is_close_2d(last, &pt)) {
            result.push(pt);
        }
    }
    while result.len() > 1 && is_close_2d(&result[0], &result[result.len() - 1]) {
        result.pop();
    }
    result
}

fn piece_area(piece: &[(f64, f64)]) -> f64 {
    let n = piece.len();
    let mut sum = 0.;
    for i in 0..n {
        let (x0, y0) = piece[i];
        let (x1, y1) = piece[(i + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    0.5 * sum.abs()
}

/// Sum of the unsigned areas of the fan triangles; zero only for collinear rings.
fn unsigned_fan_area(piece: &[(f64, f64)]) -> f64 {
    let (x0, y0) = piece[0];
    piece
        .windows(2)
        .skip(1)
        .map(|w| 0.5 * ((w[0].0 - x0) * (w[1].1 - y0) - (w[1].0 - x0) * (w[0].1 - y0)).abs())
        .sum()
}

fn piece_bounds_overlap(a: &[(f64, f64)], b: &[(f64, f64)]) -> bool {
    let bounds = |p: &[(f64, f64)]| {
        p.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    };
    let (ax0, ay0, ax1, ay1) = bounds(a);
    let (bx0, by0, bx1, by1) = bounds(b);
    !(ax1 < bx0 || bx1 < ax0 || ay1 < by0 || by1 < ay0)
}
