//! Miter offsetting of closed paths.
//!
//! Positive delta inflates the polygon set (solid outlines grow, holes
//! shrink); negative delta deflates it. Each vertex moves along the
//! bisector of its adjacent edge normals; corners whose miter would exceed
//! [`MITER_LIMIT`] times the delta are beveled instead. Paths that invert
//! or collapse under the offset are dropped, which is what terminates the
//! perimeter schedule on shapes too thin for another ring.

use crate::{Path, Point};

/// Maximum miter length as a multiple of the offset delta.
const MITER_LIMIT: f64 = 2.0;

/// Offset every path in the set by `delta` integer units.
pub fn offset(paths: &[Path], delta: f64) -> Vec<Path> {
    if delta == 0.0 {
        return paths.to_vec();
    }
    paths
        .iter()
        .filter_map(|p| offset_path(p, delta))
        .collect()
}

fn offset_path(path: &Path, delta: f64) -> Option<Path> {
    let path = path.clone().dedup();
    let n = path.points.len();
    if n < 3 {
        return None;
    }
    let area_in = path.signed_area_x2();
    if area_in == 0 {
        return None;
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let p0 = path.points[(i + n - 1) % n];
        let p1 = path.points[i];
        let p2 = path.points[(i + 1) % n];

        let e1 = edge_dir(p0, p1)?;
        let e2 = edge_dir(p1, p2)?;

        // Right-hand edge normals: outward for CCW paths, into the hole
        // for CW paths, so a single signed delta serves both.
        let n1 = (e1.1, -e1.0);
        let n2 = (e2.1, -e2.0);

        let bx = n1.0 + n2.0;
        let by = n1.1 + n2.1;
        let blen = (bx * bx + by * by).sqrt();
        if blen < 1e-9 {
            // Degenerate 180-degree spike
            push_point(&mut out, p1, n1, delta);
            push_point(&mut out, p1, n2, delta);
            continue;
        }

        let bis = (bx / blen, by / blen);
        let dot = n1.0 * bis.0 + n1.1 * bis.1;
        let miter = delta / dot;
        if dot < 1e-9 || miter.abs() > MITER_LIMIT * delta.abs() {
            // Sharp corner: bevel instead of extending the miter spike
            push_point(&mut out, p1, n1, delta);
            push_point(&mut out, p1, n2, delta);
        } else {
            push_point(&mut out, p1, bis, miter);
        }
    }

    let result = Path::new(out).dedup();
    if result.len() < 3 {
        return None;
    }
    let area_out = result.signed_area_x2();
    // An offset that flips the winding has collapsed the path
    if area_out == 0 || (area_out > 0) != (area_in > 0) {
        return None;
    }
    Some(result)
}

fn edge_dir(p: Point, q: Point) -> Option<(f64, f64)> {
    let dx = (q.x - p.x) as f64;
    let dy = (q.y - p.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return None;
    }
    Some((dx / len, dy / len))
}

fn push_point(out: &mut Vec<Point>, base: Point, dir: (f64, f64), dist: f64) {
    out.push(Point::new(
        (base.x as f64 + dir.0 * dist).round() as i64,
        (base.y as f64 + dir.1 * dist).round() as i64,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i64, y0: i64, size: i64) -> Path {
        Path::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ])
    }

    #[test]
    fn inflate_square() {
        let out = offset(&[square(0, 0, 100)], 10.0);
        assert_eq!(out.len(), 1);
        // 100x100 grows to 120x120
        assert_eq!(out[0].signed_area_x2(), 2 * 120 * 120);
        assert!(out[0].is_ccw());
    }

    #[test]
    fn deflate_square() {
        let out = offset(&[square(0, 0, 100)], -10.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].signed_area_x2(), 2 * 80 * 80);
        let b = out[0].bounds().unwrap();
        assert_eq!(b.min, Point::new(10, 10));
        assert_eq!(b.max, Point::new(90, 90));
    }

    #[test]
    fn deflate_past_collapse_drops_path() {
        let out = offset(&[square(0, 0, 100)], -60.0);
        assert!(out.is_empty());
    }

    #[test]
    fn hole_shrinks_when_inflating() {
        let mut hole = square(0, 0, 100);
        hole.reverse();
        let out = offset(&[hole], 10.0);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_hole());
        // The hole ring moves inward: 100x100 becomes 80x80
        assert_eq!(out[0].signed_area_x2(), -2 * 80 * 80);
    }

    #[test]
    fn zero_delta_is_identity() {
        let paths = vec![square(0, 0, 10)];
        assert_eq!(offset(&paths, 0.0), paths);
    }
}
