//! Line-pattern infill generation.
//!
//! A comb of parallel lines is built around the origin, rotated by the
//! configured angle (plus 90 degrees on odd layers, so stacked solid
//! regions cross into a grid), translated onto the center of the infill
//! boundary and clipped against it.

use nalgebra::{Point2, Rotation2};

use strata_clip::{self as clip, Path, Point, Segment};

use crate::config::{SlicerConfig, VERTEX_PRECISION};

/// Generate infill lines for the region bounded by `boundary`.
pub(crate) fn line_infill(cfg: &SlicerConfig, layer_no: usize, boundary: &[Path]) -> Vec<Segment> {
    let Some(bounds) = clip::bounds(boundary) else {
        return Vec::new();
    };

    let vp = VERTEX_PRECISION as f64;
    let line_length = bounds.width().max(bounds.height());
    let spacing =
        ((cfg.extrusion_width_infill() - cfg.extrusion_overlap_factor() / 2.0) * vp) as i64;
    if spacing <= 0 || line_length <= 0 {
        return Vec::new();
    }
    let n = (line_length as f64 / spacing as f64).ceil() as i64;

    let mut angle = cfg.infill_angle;
    if layer_no % 2 == 1 {
        angle += 90.0;
    }
    let rotation = Rotation2::new(angle.to_radians());
    let center = bounds.center();

    // 2n+1 vertical lines of length 2L, spaced evenly around the origin
    let mut comb = Vec::with_capacity(2 * n as usize + 1);
    for k in -n..=n {
        let x = (k * spacing) as f64;
        let a = rotation * Point2::new(x, -(line_length as f64));
        let b = rotation * Point2::new(x, line_length as f64);
        comb.push(Segment::new(
            Point::new(a.x.round() as i64 + center.x, a.y.round() as i64 + center.y),
            Point::new(b.x.round() as i64 + center.x, b.y.round() as i64 + center.y),
        ));
    }

    clip::clip_segments(&comb, boundary)
}
