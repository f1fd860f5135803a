//! Slicer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};

/// Fixed integer scale: millimeter floats become micrometer integers.
///
/// Every coordinate downstream of mesh loading is an integer multiple of
/// `1 / VERTEX_PRECISION` millimeters.
pub const VERTEX_PRECISION: i64 = 1000;

/// Slicing parameters.
///
/// Serializes to/from the JSON settings format of the desktop application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    /// Height of layer 0 above the build plate (mm).
    pub first_layer_height: f64,
    /// Height of every subsequent layer (mm).
    pub layer_height: f64,
    /// Extruder aperture (mm).
    pub nozzle_diameter: f64,
    /// Filament diameter (mm). Unused by the geometry pipeline.
    pub filament_diameter: f64,
    /// Number of concentric perimeters per outline.
    pub perimeters: u32,
    /// Number of fully-filled layers at the top of the model.
    pub top_layers: u32,
    /// Number of fully-filled layers at the bottom of the model.
    pub bottom_layers: u32,
    /// Base angle of the infill line pattern (degrees, 0-90).
    pub infill_angle: f64,
    /// How far infill lines reach into the innermost perimeter, as a
    /// percentage of the extrusion width (0-100).
    pub infill_overlap: f64,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            first_layer_height: 0.2,
            layer_height: 0.2,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            perimeters: 2,
            top_layers: 4,
            bottom_layers: 4,
            infill_angle: 45.0,
            infill_overlap: 30.0,
        }
    }
}

impl SlicerConfig {
    /// Width of an internal extrusion track.
    pub fn extrusion_width(&self) -> f64 {
        self.nozzle_diameter * 1.2
    }

    /// Width of the outermost extrusion track.
    pub fn extrusion_width_external_perimeter(&self) -> f64 {
        self.nozzle_diameter * 1.05
    }

    /// Width of an infill extrusion track.
    pub fn extrusion_width_infill(&self) -> f64 {
        self.extrusion_width()
    }

    /// Fraction of an extrusion track that squashes into its neighbor.
    pub fn extrusion_overlap_factor(&self) -> f64 {
        0.4
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.first_layer_height <= 0.0 {
            return Err(SlicerError::InvalidConfig(
                "first_layer_height must be positive".into(),
            ));
        }
        if self.layer_height <= 0.0 {
            return Err(SlicerError::InvalidConfig(
                "layer_height must be positive".into(),
            ));
        }
        if self.nozzle_diameter <= 0.0 {
            return Err(SlicerError::InvalidConfig(
                "nozzle_diameter must be positive".into(),
            ));
        }
        if self.perimeters < 1 {
            return Err(SlicerError::InvalidConfig(
                "at least one perimeter is required".into(),
            ));
        }
        if !(0.0..=90.0).contains(&self.infill_angle) {
            return Err(SlicerError::InvalidConfig(
                "infill_angle must be between 0 and 90 degrees".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.infill_overlap) {
            return Err(SlicerError::InvalidConfig(
                "infill_overlap must be between 0 and 100 percent".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SlicerConfig::default().validate().is_ok());
    }

    #[test]
    fn derived_widths() {
        let cfg = SlicerConfig::default();
        approx::assert_relative_eq!(cfg.extrusion_width(), 0.48);
        approx::assert_relative_eq!(cfg.extrusion_width_external_perimeter(), 0.42);
        approx::assert_relative_eq!(cfg.extrusion_width_infill(), 0.48);
    }

    #[test]
    fn rejects_nonpositive_layer_height() {
        let cfg = SlicerConfig {
            layer_height: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SlicerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_perimeters() {
        let cfg = SlicerConfig {
            perimeters: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let cfg = SlicerConfig {
            perimeters: 3,
            infill_angle: 30.0,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SlicerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.perimeters, 3);
        assert!((back.infill_angle - 30.0).abs() < 1e-12);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let back: SlicerConfig = serde_json::from_str(r#"{"perimeters": 4}"#).unwrap();
        assert_eq!(back.perimeters, 4);
        assert!((back.layer_height - 0.2).abs() < 1e-12);
    }
}
