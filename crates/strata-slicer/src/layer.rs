//! Per-layer processing: outlines, perimeter rings, infill boundary.

use strata_clip::{self as clip, Path, Point, Segment};

use crate::config::{SlicerConfig, VERTEX_PRECISION};
use crate::error::{Result, SlicerError};
use crate::infill;
use crate::slice::LayerContour;

/// Minimum spacing between consecutive outline points, in integer units
/// (0.05 mm). Closer points are numerical noise from the intersection
/// grid and get dropped.
const MIN_DIST_BETWEEN_POINTS: i64 = 50;

/// One processed layer: outlines, perimeter rings and infill.
///
/// All coordinates are integers in units of `1 / VERTEX_PRECISION`
/// millimeters. Outlines follow the engine convention: solids
/// counter-clockwise, holes clockwise.
#[derive(Debug)]
pub struct Layer {
    /// Layer number as sliced (survives empty-layer drops).
    pub layer_no: usize,
    /// Absolute Z of the layer plane, integer units.
    pub z: i64,
    /// Extrusion height of this layer (mm).
    pub layer_height: f64,
    /// Closed outline polygons bounding the solid region.
    pub outlines: Vec<Path>,
    /// Perimeter rings, outermost first; each ring is a set of closed
    /// polygons.
    pub perimeters: Vec<Vec<Path>>,
    /// Infill line segments.
    pub infill: Vec<Segment>,
    /// Region the infill comb is clipped against.
    pub infill_boundary: Vec<Path>,
}

impl Layer {
    /// Build a layer from its stitched contour chains.
    ///
    /// Returns `None` when nothing usable remains, which marks the layer
    /// empty.
    pub(crate) fn from_contour(
        cfg: &SlicerConfig,
        layer_no: usize,
        contour: &LayerContour,
    ) -> Option<Self> {
        let mut paths = Vec::new();
        for chain in &contour.chains {
            if chain.len() <= 1 {
                // Self-loops and stray fragments cannot form an outline
                continue;
            }
            let mut points: Vec<Point> = Vec::with_capacity(chain.len());
            for p in chain.points() {
                if let Some(&last) = points.last() {
                    if dist2(last, p) < MIN_DIST_BETWEEN_POINTS * MIN_DIST_BETWEEN_POINTS {
                        continue;
                    }
                }
                points.push(p);
            }
            while points.len() > 1 {
                let first = points[0];
                let last = points[points.len() - 1];
                if dist2(first, last) < MIN_DIST_BETWEEN_POINTS * MIN_DIST_BETWEEN_POINTS {
                    points.pop();
                } else {
                    break;
                }
            }
            if points.len() >= 3 {
                paths.push(Path::new(points));
            }
        }

        let outlines = clip::union(&paths);
        if outlines.is_empty() {
            return None;
        }

        Some(Self {
            layer_no,
            z: contour.z,
            layer_height: if layer_no == 0 {
                cfg.first_layer_height
            } else {
                cfg.layer_height
            },
            outlines,
            perimeters: Vec::new(),
            infill: Vec::new(),
            infill_boundary: Vec::new(),
        })
    }

    /// Inset the outlines into concentric perimeter rings and derive the
    /// infill boundary.
    ///
    /// Ring k is inset by `d_k`, then let back out by half its extrusion
    /// width, leaving the polyline on the centerline of the printed
    /// track. The inset-then-outset pair also collapses ring segments
    /// that would overlap themselves in tight spots.
    pub fn create_perimeters(&mut self, cfg: &SlicerConfig) -> Result<()> {
        let vp = VERTEX_PRECISION as f64;
        let w_ext = cfg.extrusion_width_external_perimeter();
        let w_int = cfg.extrusion_width();

        self.perimeters.clear();
        for k in 1..=cfg.perimeters {
            let d_k = ring_inset(cfg, k, self.layer_height);
            let half_width = if k == 1 { w_ext / 2.0 } else { w_int / 2.0 };
            let inset = clip::offset(&self.outlines, -d_k * vp);
            let ring = clip::offset(&inset, half_width * vp);
            if ring.is_empty() {
                if k == 1 {
                    return Err(SlicerError::EmptyLayer(self.layer_no));
                }
                // Too thin for further rings
                break;
            }
            self.perimeters.push(ring);
        }

        let d_innermost = ring_inset(cfg, cfg.perimeters, self.layer_height);
        let overlap = cfg.extrusion_width() * (cfg.infill_overlap / 100.0);
        let inset = clip::offset(&self.outlines, -d_innermost * vp);
        self.infill_boundary = clip::offset(&inset, overlap * vp);

        Ok(())
    }

    /// Generate line infill across this layer's own infill boundary.
    pub fn create_infill(&mut self, cfg: &SlicerConfig) {
        self.infill
            .extend(infill::line_infill(cfg, self.layer_no, &self.infill_boundary));
    }

    /// Total perimeter vertex count, for consumers sizing vertex buffers.
    pub fn node_count(&self) -> usize {
        self.perimeters
            .iter()
            .flat_map(|ring| ring.iter())
            .map(Path::len)
            .sum()
    }
}

/// Inset distance of perimeter ring `k` from the outline, in mm.
///
/// Consecutive rings sit one extrusion width apart, pulled together a
/// little because adjacent tracks squash into each other.
pub(crate) fn ring_inset(cfg: &SlicerConfig, k: u32, layer_height: f64) -> f64 {
    let steps = (k - 1) as f64;
    cfg.extrusion_width_external_perimeter() + steps * cfg.extrusion_width()
        - steps * layer_height * cfg.extrusion_overlap_factor()
}

fn dist2(a: Point, b: Point) -> i64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Slicer;
    use crate::test_meshes::cube_mesh;

    fn sliced_cube_layer(cfg: &SlicerConfig) -> Layer {
        let mesh = cube_mesh(10.0);
        let slicer = Slicer::new(cfg, &mesh).unwrap();
        let out = slicer.slice(None).unwrap();
        Layer::from_contour(cfg, 10, &out.contours[10]).unwrap()
    }

    #[test]
    fn outline_is_a_single_square() {
        let cfg = SlicerConfig::default();
        let layer = sliced_cube_layer(&cfg);
        assert_eq!(layer.outlines.len(), 1);
        let area = layer.outlines[0].signed_area();
        // 10 mm x 10 mm in grid units
        assert!((area - 1.0e8).abs() < 1.0e5, "{area}");
    }

    #[test]
    fn perimeter_one_sits_on_the_external_centerline() {
        let cfg = SlicerConfig::default();
        let mut layer = sliced_cube_layer(&cfg);
        layer.create_perimeters(&cfg).unwrap();
        assert_eq!(layer.perimeters.len(), 2);

        // Net inset of ring 1 is half the external width: 0.21 mm,
        // so the square shrinks from 10 to 9.58 mm on a side
        let b = clip::bounds(&layer.perimeters[0]).unwrap();
        assert!((b.width() - 9580).abs() <= 2, "{}", b.width());
        assert!((b.height() - 9580).abs() <= 2);

        // Ring 2 is a further extrusion width (minus squash) inside
        let b2 = clip::bounds(&layer.perimeters[1]).unwrap();
        assert!(b2.width() < b.width());
        let expected = 10_000 - 2 * ((ring_inset(&cfg, 2, 0.2) - 0.24) * 1000.0) as i64;
        assert!((b2.width() - expected).abs() <= 2, "{} vs {expected}", b2.width());
    }

    #[test]
    fn rings_nest_strictly() {
        let cfg = SlicerConfig {
            perimeters: 3,
            ..Default::default()
        };
        let mut layer = sliced_cube_layer(&cfg);
        layer.create_perimeters(&cfg).unwrap();
        assert_eq!(layer.perimeters.len(), 3);
        for pair in layer.perimeters.windows(2) {
            let outer = clip::bounds(&pair[0]).unwrap();
            let inner = clip::bounds(&pair[1]).unwrap();
            assert!(inner.min.x > outer.min.x);
            assert!(inner.min.y > outer.min.y);
            assert!(inner.max.x < outer.max.x);
            assert!(inner.max.y < outer.max.y);
        }
    }

    #[test]
    fn too_thin_for_first_perimeter_is_an_empty_layer() {
        // A sliver narrower than the external extrusion width
        let cfg = SlicerConfig::default();
        let mut layer = Layer {
            layer_no: 3,
            z: 800,
            layer_height: 0.2,
            outlines: vec![Path::new(vec![
                Point::new(0, 0),
                Point::new(10_000, 0),
                Point::new(10_000, 100),
                Point::new(0, 100),
            ])],
            perimeters: Vec::new(),
            infill: Vec::new(),
            infill_boundary: Vec::new(),
        };
        assert!(matches!(
            layer.create_perimeters(&cfg),
            Err(SlicerError::EmptyLayer(3))
        ));
    }

    #[test]
    fn infill_stays_inside_the_boundary() {
        let cfg = SlicerConfig::default();
        let mut layer = sliced_cube_layer(&cfg);
        layer.create_perimeters(&cfg).unwrap();
        layer.create_infill(&cfg);
        assert!(!layer.infill.is_empty());
        for seg in &layer.infill {
            assert!(clip::point_in_paths(&layer.infill_boundary, seg.midpoint()));
        }
    }

    #[test]
    fn node_count_sums_ring_vertices() {
        let cfg = SlicerConfig::default();
        let mut layer = sliced_cube_layer(&cfg);
        layer.create_perimeters(&cfg).unwrap();
        // Two square rings
        assert_eq!(layer.node_count(), 8);
    }
}
