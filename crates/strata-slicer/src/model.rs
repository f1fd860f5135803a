//! The sliced model: per-layer orchestration of perimeters and solid
//! infill, including mid-stack island surfaces.

use rayon::prelude::*;

use strata_clip as clip;
use strata_mesh::BoundingBox;

use crate::config::{SlicerConfig, VERTEX_PRECISION};
use crate::error::{Result, SlicerError};
use crate::infill;
use crate::layer::{ring_inset, Layer};
use crate::slice::SliceOutput;
use crate::{report, Progress};

/// All layers of a sliced mesh, in ascending Z order.
///
/// Write-once: constructed from contours, then perimeters, then infill;
/// read-only afterwards.
#[derive(Debug)]
pub struct SlicedModel {
    /// Processed layers, ascending Z. Empty layers are dropped, so the
    /// vector index can run ahead of [`Layer::layer_no`].
    pub layers: Vec<Layer>,
    /// Bounding box of the source mesh (mm, untranslated).
    pub bounding_box: BoundingBox,
    /// Configuration the model was sliced with.
    pub config: SlicerConfig,
    /// Triangles the slicer skipped as degenerate.
    pub degenerate_triangles: usize,
}

impl SlicedModel {
    pub(crate) fn new(config: SlicerConfig, bounding_box: BoundingBox, output: SliceOutput) -> Self {
        let total = output.contours.len();
        let layers: Vec<Layer> = output
            .contours
            .iter()
            .enumerate()
            .filter_map(|(no, contour)| Layer::from_contour(&config, no, contour))
            .collect();
        if layers.len() < total {
            log::debug!("{} of {total} layers had no outline", total - layers.len());
        }
        Self {
            layers,
            bounding_box,
            config,
            degenerate_triangles: output.degenerate_triangles,
        }
    }

    /// Number of layers currently in the model.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total perimeter vertex count across all layers.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Layer::node_count).sum()
    }

    /// Generate perimeter rings for every layer, dropping layers that
    /// turn out too small to print.
    pub fn create_perimeters(&mut self, mut progress: Option<Progress<'_>>) -> Result<()> {
        if report(&mut progress, 100, "creating perimeters") {
            return Err(SlicerError::Cancelled);
        }

        let cfg = self.config.clone();
        let results: Vec<Result<()>> = self
            .layers
            .par_iter_mut()
            .map(|layer| layer.create_perimeters(&cfg))
            .collect();

        let mut kept = Vec::with_capacity(self.layers.len());
        for (layer, result) in self.layers.drain(..).zip(results) {
            match result {
                Ok(()) => kept.push(layer),
                Err(SlicerError::EmptyLayer(no)) => {
                    log::warn!("dropping empty layer {no}");
                }
                Err(other) => return Err(other),
            }
        }
        self.layers = kept;
        Ok(())
    }

    /// Generate solid infill for the bottom and top of the stack, plus
    /// any mid-stack top surfaces (islands).
    pub fn create_infill(&mut self, mut progress: Option<Progress<'_>>) -> Result<()> {
        if report(&mut progress, 100, "creating top and bottom infill") {
            return Err(SlicerError::Cancelled);
        }

        let count = self.layers.len();
        if count == 0 {
            return Ok(());
        }
        let (bottom, top) = self.solid_layer_counts();

        let cfg = self.config.clone();
        self.layers
            .par_iter_mut()
            .enumerate()
            .filter(|(i, _)| *i < bottom || *i >= count - top)
            .for_each(|(_, layer)| layer.create_infill(&cfg));

        self.create_island_infill(bottom, top);
        Ok(())
    }

    /// Solid bottom/top layer counts, clamped so they never cover the
    /// whole stack twice.
    fn solid_layer_counts(&self) -> (usize, usize) {
        let count = self.layers.len();
        let bottom = self.config.bottom_layers as usize;
        let top = self.config.top_layers as usize;
        if bottom + top >= count {
            (1, count - 1)
        } else {
            (bottom, top)
        }
    }

    /// A top surface can appear mid-stack wherever a layer's outline
    /// reaches beyond the outline of the layer above it. Walking the
    /// stack top-down, such exposed regions get solid infill, propagated
    /// through the following lower layers so the island ceiling receives
    /// its full solid stack.
    fn create_island_infill(&mut self, bottom: usize, top: usize) {
        if top == 0 {
            return;
        }
        let count = self.layers.len();
        let cfg = &self.config;
        let vp = VERTEX_PRECISION as f64;

        let mut additions: Vec<(usize, Vec<strata_clip::Segment>)> = Vec::new();
        for i in (bottom + 1..count).rev() {
            if i - 1 >= count - top {
                // Layer below is in the solid top region already
                continue;
            }
            let current = &self.layers[i];
            let below = &self.layers[i - 1];

            let d = ring_inset(cfg, cfg.perimeters, below.layer_height) * vp;
            let below_inset = clip::offset(&below.outlines, -d);
            let island = clip::difference(&below_inset, &current.outlines);
            if island.is_empty() {
                continue;
            }

            // The exposed part of the lower layer: let the island back
            // out over the perimeter zone, bounded by the inset region
            let region = clip::intersection(&clip::offset(&island, d), &below_inset);
            if region.is_empty() {
                continue;
            }
            additions.push((i - 1, infill::line_infill(cfg, below.layer_no, &region)));

            // The island ceiling needs top_layers of solid fill in total
            for step in 1..top {
                let Some(idx) = (i - 1).checked_sub(step) else {
                    break;
                };
                if idx < bottom {
                    break;
                }
                let deeper = &self.layers[idx];
                let overlap = clip::intersection(&region, &deeper.outlines);
                if overlap.is_empty() {
                    break;
                }
                additions.push((idx, infill::line_infill(cfg, deeper.layer_no, &overlap)));
            }
        }

        for (idx, segments) in additions {
            self.layers[idx].infill.extend(segments);
        }
    }

    /// Outline edges of every layer as 3D millimeter segments, for
    /// previewing the sliced model before perimeters exist.
    pub fn outline_segments(&self) -> Vec<([f64; 3], [f64; 3])> {
        let vp = VERTEX_PRECISION as f64;
        let mut segments = Vec::new();
        for layer in &self.layers {
            let z = layer.z as f64 / vp;
            for outline in &layer.outlines {
                let n = outline.len();
                for i in 0..n {
                    let a = outline.points[i];
                    let b = outline.points[(i + 1) % n];
                    segments.push((
                        [a.x as f64 / vp, a.y as f64 / vp, z],
                        [b.x as f64 / vp, b.y as f64 / vp, z],
                    ));
                }
            }
        }
        segments
    }
}
