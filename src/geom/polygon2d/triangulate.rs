use crate::geom::point2d::{Point2D, orient2d};
use crate::geom::polygon2d::Polygon2D;
use anyhow::{Result, anyhow};

/// Triangulates a simple polygon with the ear-clipping algorithm.
///
/// Triangles are returned counter-clockwise. Collinear corners are dropped.
pub fn triangulate(poly: &Polygon2D) -> Result<Vec<[Point2D; 3]>> {
    let ccw = poly.to_ccw();
    let pts = ccw.vertices();
    let bbox = ccw.bounds();
    let tol = 1e-12 * bbox.width().max(bbox.height()).max(1.).powi(2);

    let mut vertices: Vec<usize> = (0..pts.len()).collect();
    let mut triangles: Vec<[Point2D; 3]> = Vec::with_capacity(pts.len().saturating_sub(2));
    let mut pos: usize = 0;
    let mut num_fail: usize = 0;

    while vertices.len() > 2 {
        if num_fail > vertices.len() {
            return Err(anyhow!("Ear-clipping algorithm failed."));
        }

        // If last vertex, start from the beginning
        if pos > vertices.len() - 1 {
            pos = 0;
        }

        let prev_pos = if pos > 0 { pos - 1 } else { vertices.len() - 1 };
        let next_pos = if pos < vertices.len() - 1 { pos + 1 } else { 0 };

        let prev_pt = pts[vertices[prev_pos]];
        let curr_pt = pts[vertices[pos]];
        let next_pt = pts[vertices[next_pos]];

        let turn = orient2d(prev_pt, curr_pt, next_pt);
        if turn.abs() <= tol {
            // Collinear corner contributes no area
            vertices.remove(pos);
            num_fail = 0;
            continue;
        }

        if turn > 0. {
            // Check if no other point is within this triangle
            // Needed for non-convex polygons
            let any_point_inside = vertices.iter().any(|&id| {
                let p = pts[id];
                !p.is_close(&prev_pt)
                    && !p.is_close(&curr_pt)
                    && !p.is_close(&next_pt)
                    && is_point_inside_triangle(p, prev_pt, curr_pt, next_pt, tol)
            });
            if !any_point_inside {
                triangles.push([prev_pt, curr_pt, next_pt]);
                vertices.remove(pos);
                num_fail = 0;
                continue;
            }
        }
        num_fail += 1;
        pos += 1;
    }

    Ok(triangles)
}

/// Tests if `ptest` lies inside the counter-clockwise triangle (boundary included).
fn is_point_inside_triangle(ptest: Point2D, p1: Point2D, p2: Point2D, p3: Point2D, tol: f64) -> bool {
    orient2d(p1, p2, ptest) >= -tol && orient2d(p2, p3, ptest) >= -tol && orient2d(p3, p1, ptest) >= -tol
}
