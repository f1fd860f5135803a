#![warn(missing_docs)]

//! Layered toolpath generation from triangle meshes.
//!
//! This crate turns an STL mesh into per-layer printing geometry:
//!
//! 1. **Slicing** — each triangle is intersected with its layer planes;
//!    shared-edge bookkeeping links the intersections so contours stitch
//!    together without searching ([`slice::Slicer`]).
//! 2. **Outlines** — per layer, the stitched chains union into closed
//!    integer polygons ([`Layer`]).
//! 3. **Perimeters** — outlines inset into concentric extrusion rings.
//! 4. **Infill** — a rotated line comb fills solid top/bottom surfaces,
//!    including island surfaces that appear mid-stack ([`SlicedModel`]).
//!
//! All geometry past slicing is integer, in units of
//! `1 / VERTEX_PRECISION` millimeters.
//!
//! # Example
//!
//! ```ignore
//! use strata_slicer::{slice, SlicerConfig};
//!
//! let mesh = strata_mesh::load_mesh("part.stl")?;
//! let mut model = slice(&mesh, &SlicerConfig::default(), None)?;
//! model.create_perimeters(None)?;
//! model.create_infill(None)?;
//!
//! for layer in &model.layers {
//!     println!("layer {} at {} um", layer.layer_no, layer.z);
//! }
//! ```

mod chain;
pub mod config;
pub mod error;
mod infill;
pub mod layer;
pub mod model;
pub mod slice;
mod svg;

#[cfg(test)]
mod test_meshes;

pub use chain::{Chain, Intersection};
pub use config::{SlicerConfig, VERTEX_PRECISION};
pub use error::{Result, SlicerError};
pub use layer::Layer;
pub use model::SlicedModel;
pub use slice::{LayerContour, SliceOutput, Slicer};

use strata_mesh::Mesh;

/// Progress callback: receives a percentage (0-100) and a status message,
/// returns `true` to request cancellation.
pub type Progress<'a> = &'a mut dyn FnMut(u32, &str) -> bool;

/// Invoke an optional progress callback; `true` means cancel.
pub(crate) fn report(progress: &mut Option<Progress<'_>>, percent: u32, msg: &str) -> bool {
    match progress {
        Some(callback) => callback(percent, msg),
        None => false,
    }
}

/// Slice a mesh into a [`SlicedModel`].
///
/// The returned model holds per-layer outlines; call
/// [`SlicedModel::create_perimeters`] and [`SlicedModel::create_infill`]
/// to finish the toolpaths. The progress callback runs roughly once per
/// percent of triangles and cancels the slice by returning `true`, in
/// which case all partial state is dropped and
/// [`SlicerError::Cancelled`] comes back.
pub fn slice(
    mesh: &Mesh,
    config: &SlicerConfig,
    progress: Option<Progress<'_>>,
) -> Result<SlicedModel> {
    let slicer = Slicer::new(config, mesh)?;
    let output = slicer.slice(progress)?;
    Ok(SlicedModel::new(
        config.clone(),
        mesh.bounding_box,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::{cube_mesh, thin_wafer_mesh};

    #[test]
    fn slice_runs_the_whole_pipeline() {
        let cfg = SlicerConfig::default();
        let mesh = cube_mesh(10.0);
        let mut model = slice(&mesh, &cfg, None).unwrap();
        model.create_perimeters(None).unwrap();
        model.create_infill(None).unwrap();
        assert_eq!(model.layer_count(), 50);
        assert_eq!(model.bounding_box, mesh.bounding_box);
    }

    #[test]
    fn model_too_thin_to_slice_has_no_layers() {
        let cfg = SlicerConfig::default();
        let model = slice(&thin_wafer_mesh(), &cfg, None).unwrap();
        assert_eq!(model.layer_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let cfg = SlicerConfig {
            perimeters: 0,
            ..Default::default()
        };
        assert!(matches!(
            slice(&cube_mesh(10.0), &cfg, None),
            Err(SlicerError::InvalidConfig(_))
        ));
    }
}
