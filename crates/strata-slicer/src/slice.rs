//! Topological mesh slicing.
//!
//! Implementation of "An improved slicing algorithm with efficient contour
//! construction using STL files" (Zhang & Joshi). Each triangle is sorted
//! by Z into `(v_min, v_med, v_max)`; the slot tags of `v_min` and `v_max`
//! (their positions in the original winding) decide which of its edges the
//! contour enters and exits through, so intersections link to their
//! neighbors through shared edges without any searching.
//!
//! Before slicing, the mesh is centered on the Z axis, rested on the build
//! plate, scaled by [`VERTEX_PRECISION`] and truncated to 32-bit integers.
//! Everything downstream of this module is integer geometry.

use std::collections::HashMap;

use strata_clip::Point;
use strata_mesh::Mesh;

use crate::chain::{edge_key, Chain, ChainSet, EdgeKey, Intersection};
use crate::config::{SlicerConfig, VERTEX_PRECISION};
use crate::error::{Result, SlicerError};
use crate::{report, Progress};

/// The stitched intersection chains of one layer.
#[derive(Debug)]
pub struct LayerContour {
    /// Absolute Z of the layer plane, integer units.
    pub z: i64,
    /// Closed and open chains found on this plane.
    pub chains: Vec<Chain>,
}

/// Output of the slicing phase.
#[derive(Debug)]
pub struct SliceOutput {
    /// One contour per layer plane, in ascending Z order.
    pub contours: Vec<LayerContour>,
    /// Triangles skipped as degenerate (duplicate vertices or parallel to
    /// the layer planes).
    pub degenerate_triangles: usize,
}

/// Slices a prepared mesh into per-layer contours.
pub struct Slicer {
    first_layer_height: i64,
    layer_height: i64,
    layer_count: usize,
    /// Deduplicated integer vertex positions; index is the edge-identity key.
    positions: Vec<[i32; 3]>,
    /// Position indices, three per triangle.
    triangles: Vec<[u32; 3]>,
}

impl Slicer {
    /// Prepare a mesh for slicing: validate, translate, scale, deduplicate.
    pub fn new(config: &SlicerConfig, mesh: &Mesh) -> Result<Self> {
        config.validate()?;
        if mesh.facet_count == 0 {
            return Err(SlicerError::EmptyMesh);
        }

        let bb = &mesh.bounding_box;
        let tx = -(bb.x_min as f64 + bb.x_max as f64) / 2.0;
        let ty = -(bb.y_min as f64 + bb.y_max as f64) / 2.0;
        let tz = -(bb.z_min as f64);
        let vp = VERTEX_PRECISION as f64;

        let mut seen: HashMap<[i32; 3], u32> = HashMap::new();
        let mut positions: Vec<[i32; 3]> = Vec::new();
        let mut index_map: Vec<u32> = Vec::with_capacity(mesh.num_vertices());
        for i in 0..mesh.num_vertices() {
            let v = mesh.vertex(i as u32);
            let p = [
                ((v[0] as f64 + tx) * vp) as i32,
                ((v[1] as f64 + ty) * vp) as i32,
                ((v[2] as f64 + tz) * vp) as i32,
            ];
            let id = *seen.entry(p).or_insert_with(|| {
                positions.push(p);
                (positions.len() - 1) as u32
            });
            index_map.push(id);
        }

        let triangles: Vec<[u32; 3]> = mesh
            .indices
            .chunks_exact(3)
            .map(|c| {
                [
                    index_map[c[0] as usize],
                    index_map[c[1] as usize],
                    index_map[c[2] as usize],
                ]
            })
            .collect();

        let first_layer_height = (config.first_layer_height * vp) as i64;
        let layer_height = (config.layer_height * vp) as i64;
        let z_max = positions.iter().map(|p| p[2] as i64).max().unwrap_or(0);
        let layer_count = if z_max >= first_layer_height {
            ((z_max - first_layer_height).div_euclid(layer_height) + 1) as usize
        } else {
            0
        };

        Ok(Self {
            first_layer_height,
            layer_height,
            layer_count,
            positions,
            triangles,
        })
    }

    /// Number of layer planes that will be sliced.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Intersect every triangle with its layer planes and stitch the
    /// results into per-layer chains.
    ///
    /// The progress callback runs roughly once per percent of triangles;
    /// returning `true` from it cancels the slice.
    pub fn slice(&self, mut progress: Option<Progress<'_>>) -> Result<SliceOutput> {
        let mut layers: Vec<ChainSet> = (0..self.layer_count).map(|_| ChainSet::new()).collect();
        let total = self.triangles.len();
        let update_interval = (total / 100).max(1);
        let mut degenerate = 0usize;

        for (no, tri) in self.triangles.iter().enumerate() {
            if !self.slice_triangle(tri, &mut layers) {
                degenerate += 1;
            }

            if (no + 1) % update_interval == 0 {
                let msg = format!("{}/{} triangles sliced", no + 1, total);
                if report(&mut progress, ((no + 1) * 100 / total) as u32, &msg) {
                    return Err(SlicerError::Cancelled);
                }
            }
        }

        let contours: Vec<LayerContour> = layers
            .into_iter()
            .enumerate()
            .map(|(i, set)| LayerContour {
                z: self.first_layer_height + i as i64 * self.layer_height,
                chains: set.into_chains(),
            })
            .collect();

        let open: usize = contours
            .iter()
            .map(|c| c.chains.iter().filter(|ch| !ch.is_closed()).count())
            .sum();
        if open > 0 {
            log::warn!("{open} open contour chains; mesh may not be manifold");
        }
        if degenerate > 0 {
            log::debug!("skipped {degenerate} degenerate triangles");
        }

        Ok(SliceOutput {
            contours,
            degenerate_triangles: degenerate,
        })
    }

    /// Returns false when the triangle was skipped as degenerate.
    fn slice_triangle(&self, tri: &[u32; 3], layers: &mut [ChainSet]) -> bool {
        let [i1, i2, i3] = *tri;
        if i1 == i2 || i2 == i3 || i1 == i3 {
            return false;
        }

        // Sort vertices by Z, remembering each one's slot in the winding.
        // The sort is stable, matching the tie behavior of cascaded >=
        // comparisons.
        let mut order = [(i1, 0u8), (i2, 1u8), (i3, 2u8)];
        order.sort_by(|a, b| self.z(b.0).cmp(&self.z(a.0)));
        let (v_max, v_med, v_min) = (order[0], order[1], order[2]);

        let z_min = self.z(v_min.0) as i64;
        let z_med = self.z(v_med.0) as i64;
        let z_max = self.z(v_max.0) as i64;
        if z_min == z_max {
            // Parallel to the layer planes; neighbors supply the contour
            return false;
        }

        let s1 = edge_key(v_min.0, v_max.0);
        let s2 = edge_key(v_min.0, v_med.0);
        let s3 = edge_key(v_med.0, v_max.0);

        // Orientation decides which edge leads into the next triangle.
        // Six cases by the slot tags of v_min and v_max.
        let (lower_fwd, upper_fwd, lower_bwd, upper_bwd) = match (v_min.1, v_max.1) {
            (0, 1) | (1, 2) | (2, 0) => (s2, s3, s1, s1),
            (0, 2) | (1, 0) | (2, 1) => (s1, s1, s2, s3),
            _ => return false,
        };

        let start = self.layer_for(z_min);
        let middle = self.layer_for(z_med);
        let end = self.layer_for(z_max);

        for layer in start..middle {
            self.emit(layer, lower_fwd, lower_bwd, layers);
        }
        for layer in middle..end {
            self.emit(layer, upper_fwd, upper_bwd, layers);
        }
        true
    }

    fn emit(&self, layer: i64, forward: EdgeKey, backward: EdgeKey, layers: &mut [ChainSet]) {
        let z = self.first_layer_height + layer * self.layer_height;
        layers[layer as usize].add(Intersection {
            point: self.point_at_z(forward, z),
            forward,
            backward,
        });
    }

    /// First layer index at or above `z`, clamped to the build plate.
    fn layer_for(&self, z: i64) -> i64 {
        ((z - self.first_layer_height).div_euclid(self.layer_height) + 1).max(0)
    }

    fn z(&self, index: u32) -> i32 {
        self.positions[index as usize][2]
    }

    /// Intersect the edge with the plane at `z`.
    ///
    /// Parametric line equation solved for the Z component:
    /// `s = (z - p.z) / (q.z - p.z)`.
    fn point_at_z(&self, edge: EdgeKey, z: i64) -> Point {
        let p = self.positions[edge.0 as usize];
        let q = self.positions[edge.1 as usize];
        let s = (z - p[2] as i64) as f64 / (q[2] as i64 - p[2] as i64) as f64;
        Point::new(
            (p[0] as f64 + s * (q[0] - p[0]) as f64) as i64,
            (p[1] as f64 + s * (q[1] - p[1]) as f64) as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::{cube_mesh, tetrahedron_mesh};

    fn default_config() -> SlicerConfig {
        SlicerConfig::default()
    }

    #[test]
    fn cube_layer_count() {
        // 10 mm cube, 0.2 mm layers: planes at 0.2, 0.4, .. 10.0
        let slicer = Slicer::new(&default_config(), &cube_mesh(10.0)).unwrap();
        assert_eq!(slicer.layer_count(), 50);
    }

    #[test]
    fn cube_contours_are_closed_squares() {
        let mesh = cube_mesh(10.0);
        let slicer = Slicer::new(&default_config(), &mesh).unwrap();
        let out = slicer.slice(None).unwrap();
        assert_eq!(out.contours.len(), 50);
        for contour in &out.contours {
            assert_eq!(contour.chains.len(), 1, "z={}", contour.z);
            assert!(contour.chains[0].is_closed(), "z={}", contour.z);
            // Mesh is centered on the Z axis: the square spans +-5 mm
            for p in contour.chains[0].points() {
                assert!(p.x == -5000 || p.x == 5000 || p.y == -5000 || p.y == 5000);
            }
        }
    }

    #[test]
    fn horizontal_faces_are_skipped_but_contours_close() {
        // Top and bottom cube faces lie exactly on layer planes (z=0 and
        // z=10.0); the vertical faces still close every contour,
        // including the topmost one.
        let mesh = cube_mesh(10.0);
        let slicer = Slicer::new(&default_config(), &mesh).unwrap();
        let out = slicer.slice(None).unwrap();
        assert_eq!(out.degenerate_triangles, 4);
        let top = out.contours.last().unwrap();
        assert_eq!(top.z, 10_000);
        assert_eq!(top.chains.len(), 1);
        assert!(top.chains[0].is_closed());
    }

    #[test]
    fn tetrahedron_contours_shrink_with_height() {
        let mesh = tetrahedron_mesh(10.0);
        let slicer = Slicer::new(&default_config(), &mesh).unwrap();
        let out = slicer.slice(None).unwrap();
        assert_eq!(out.contours.len(), 50);
        let spans: Vec<i64> = out
            .contours
            .iter()
            .map(|c| {
                let xs: Vec<i64> = c.chains[0].points().map(|p| p.x).collect();
                xs.iter().max().unwrap() - xs.iter().min().unwrap()
            })
            .collect();
        for w in spans.windows(2) {
            assert!(w[1] < w[0], "legs must shrink linearly: {spans:?}");
        }
    }

    #[test]
    fn progress_callback_reports_and_cancels() {
        let mesh = cube_mesh(10.0);
        let slicer = Slicer::new(&default_config(), &mesh).unwrap();

        let mut calls = 0;
        let mut cb = |_pct: u32, _msg: &str| {
            calls += 1;
            false
        };
        slicer.slice(Some(&mut cb)).unwrap();
        assert!(calls >= 10);

        let mut cancel = |_pct: u32, _msg: &str| true;
        let err = slicer.slice(Some(&mut cancel)).unwrap_err();
        assert!(matches!(err, SlicerError::Cancelled));
    }

    #[test]
    fn empty_mesh_is_fatal() {
        let mut mesh = cube_mesh(10.0);
        mesh.facet_count = 0;
        mesh.indices.clear();
        assert!(matches!(
            Slicer::new(&default_config(), &mesh),
            Err(SlicerError::EmptyMesh)
        ));
    }

    #[test]
    fn scaling_round_trip_stays_within_grid() {
        for v in [0.0f64, 0.1, 1.2345, 99.999, 123.456] {
            let scaled = (v * VERTEX_PRECISION as f64) as i64;
            assert!((scaled as f64 / VERTEX_PRECISION as f64 - v).abs() < 1e-3);
        }
    }
}
