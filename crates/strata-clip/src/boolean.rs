//! Boolean operations on closed path sets, and clipping of open segments.
//!
//! Paths are assembled into polygons-with-holes by containment parity
//! (a ring nested inside an odd number of other rings is a hole), handed
//! to the `geo` boolean kernel in `f64`, and rounded back to the grid on
//! the way out. Union resolves overlapping rings with non-zero semantics;
//! results always come back with solid outlines counter-clockwise and
//! holes clockwise.

use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Polygon as GeoPolygon};

use crate::{Path, Point, Segment};

/// Union of a set of closed paths.
///
/// Accepts raw rings in arbitrary order and winding; nesting is derived
/// from containment, and overlapping rings are merged.
pub fn union(paths: &[Path]) -> Vec<Path> {
    let polys = assemble(paths);
    let mut acc = MultiPolygon::<f64>(Vec::new());
    for poly in polys {
        let mp = MultiPolygon(vec![poly]);
        acc = if acc.0.is_empty() { mp } else { acc.union(&mp) };
    }
    from_multipolygon(&acc)
}

/// Intersection of two closed path sets.
pub fn intersection(subject: &[Path], clip: &[Path]) -> Vec<Path> {
    if subject.is_empty() || clip.is_empty() {
        return Vec::new();
    }
    from_multipolygon(&to_multipolygon(subject).intersection(&to_multipolygon(clip)))
}

/// Difference of two closed path sets (`subject` minus `clip`).
pub fn difference(subject: &[Path], clip: &[Path]) -> Vec<Path> {
    if subject.is_empty() {
        return Vec::new();
    }
    let s = to_multipolygon(subject);
    if clip.is_empty() {
        return from_multipolygon(&s);
    }
    from_multipolygon(&s.difference(&to_multipolygon(clip)))
}

/// Clip open segments against a closed path set, keeping the interior
/// parts (even-odd).
pub fn clip_segments(segments: &[Segment], boundary: &[Path]) -> Vec<Segment> {
    if segments.is_empty() || boundary.is_empty() {
        return Vec::new();
    }
    let mp = to_multipolygon(boundary);
    let lines = MultiLineString(
        segments
            .iter()
            .map(|s| LineString::new(vec![to_coord(s.a), to_coord(s.b)]))
            .collect(),
    );
    let clipped = mp.clip(&lines, false);

    let mut out = Vec::new();
    for ls in clipped.0 {
        if ls.0.len() < 2 {
            continue;
        }
        let a = round_coord(ls.0[0]);
        let b = round_coord(ls.0[ls.0.len() - 1]);
        if a != b {
            out.push(Segment::new(a, b));
        }
    }
    out
}

fn to_coord(p: Point) -> Coord<f64> {
    Coord {
        x: p.x as f64,
        y: p.y as f64,
    }
}

fn round_coord(c: Coord<f64>) -> Point {
    Point::new(c.x.round() as i64, c.y.round() as i64)
}

fn to_linestring(path: &Path) -> LineString<f64> {
    LineString::new(path.points.iter().map(|&p| to_coord(p)).collect())
}

/// Assemble raw rings into `geo` polygons with holes attached to their
/// immediate parents.
fn assemble(paths: &[Path]) -> Vec<GeoPolygon<f64>> {
    let rings: Vec<&Path> = paths
        .iter()
        .filter(|p| p.len() >= 3 && p.signed_area_x2() != 0)
        .collect();

    // Containment depth of each ring, probed at its first vertex
    let depth: Vec<usize> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && other.contains_point(ring.points[0]))
                .count()
        })
        .collect();

    let mut polys = Vec::new();
    let mut hole_lists: Vec<Vec<LineString<f64>>> = Vec::new();
    let mut outer_of: Vec<Option<usize>> = vec![None; rings.len()];

    for (i, ring) in rings.iter().enumerate() {
        if depth[i] % 2 == 0 {
            let mut r = (*ring).clone();
            if !r.is_ccw() {
                r.reverse();
            }
            outer_of[i] = Some(polys.len());
            polys.push(to_linestring(&r));
            hole_lists.push(Vec::new());
        }
    }

    for (i, ring) in rings.iter().enumerate() {
        if depth[i] % 2 == 1 {
            // Parent is the containing outer one nesting level up
            let parent = rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i && depth[j] == depth[i] - 1 && other.contains_point(ring.points[0])
                })
                .min_by_key(|&(_, other)| other.signed_area_x2().unsigned_abs())
                .and_then(|(j, _)| outer_of[j]);
            if let Some(parent) = parent {
                let mut r = (*ring).clone();
                if r.is_ccw() {
                    r.reverse();
                }
                hole_lists[parent].push(to_linestring(&r));
            }
        }
    }

    polys
        .into_iter()
        .zip(hole_lists)
        .map(|(exterior, holes)| GeoPolygon::new(exterior, holes))
        .collect()
}

fn to_multipolygon(paths: &[Path]) -> MultiPolygon<f64> {
    MultiPolygon(assemble(paths))
}

/// Convert back to integer paths: solid outlines CCW, holes CW.
fn from_multipolygon(mp: &MultiPolygon<f64>) -> Vec<Path> {
    let mut out = Vec::new();
    for poly in &mp.0 {
        if let Some(p) = ring_to_path(poly.exterior(), false) {
            out.push(p);
        }
        for interior in poly.interiors() {
            if let Some(p) = ring_to_path(interior, true) {
                out.push(p);
            }
        }
    }
    out
}

fn ring_to_path(ls: &LineString<f64>, hole: bool) -> Option<Path> {
    let mut path = Path::new(ls.0.iter().map(|&c| round_coord(c)).collect()).dedup();
    if path.len() < 3 || path.signed_area_x2() == 0 {
        return None;
    }
    if path.is_ccw() == hole {
        path.reverse();
    }
    Some(path)
}
