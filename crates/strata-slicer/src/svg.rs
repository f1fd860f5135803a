//! SVG export of processed layers.
//!
//! Integer grid coordinates divide back to millimeters on the way out,
//! and Y is negated to match SVG's top-down axis.

use std::io::{self, Write};

use strata_clip::{self as clip, Path};

use crate::config::VERTEX_PRECISION;
use crate::layer::Layer;

impl Layer {
    /// Serialize the layer as a standalone SVG document: outlines as a
    /// filled region, perimeters as strokes, infill as hairlines.
    pub fn write_svg<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let vp = VERTEX_PRECISION as f64;
        let Some(bounds) = clip::bounds(&self.outlines) else {
            return writeln!(out, r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        };

        // One extrusion width of margin keeps strokes inside the canvas
        let margin = 1.0;
        let min_x = bounds.min.x as f64 / vp - margin;
        let min_y = -(bounds.max.y as f64) / vp - margin;
        let width = bounds.width() as f64 / vp + 2.0 * margin;
        let height = bounds.height() as f64 / vp + 2.0 * margin;

        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{min_x:.3} {min_y:.3} {width:.3} {height:.3}">"#
        )?;
        writeln!(
            out,
            r#"<!-- layer {} at z={:.3} mm -->"#,
            self.layer_no,
            self.z as f64 / vp
        )?;

        if !self.outlines.is_empty() {
            writeln!(
                out,
                r##"<path d="{}" fill="#e0e0e0" fill-rule="evenodd" stroke="none"/>"##,
                path_data(&self.outlines)
            )?;
        }
        for ring in &self.perimeters {
            writeln!(
                out,
                r##"<path d="{}" fill="none" stroke="#303030" stroke-width="0.1"/>"##,
                path_data(ring)
            )?;
        }
        for seg in &self.infill {
            writeln!(
                out,
                r##"<line x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" stroke="#8080ff" stroke-width="0.05"/>"##,
                seg.a.x as f64 / vp,
                -seg.a.y as f64 / vp,
                seg.b.x as f64 / vp,
                -seg.b.y as f64 / vp,
            )?;
        }

        writeln!(out, "</svg>")
    }
}

fn path_data(paths: &[Path]) -> String {
    let vp = VERTEX_PRECISION as f64;
    let mut d = String::new();
    for path in paths {
        for (i, p) in path.points.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            d.push_str(&format!(
                "{cmd}{:.3} {:.3} ",
                p.x as f64 / vp,
                -p.y as f64 / vp
            ));
        }
        d.push_str("Z ");
    }
    d.pop();
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlicerConfig;
    use crate::slice::Slicer;
    use crate::test_meshes::cube_mesh;

    #[test]
    fn svg_contains_layer_geometry() {
        let cfg = SlicerConfig::default();
        let mesh = cube_mesh(10.0);
        let slicer = Slicer::new(&cfg, &mesh).unwrap();
        let out = slicer.slice(None).unwrap();
        let mut layer = Layer::from_contour(&cfg, 0, &out.contours[0]).unwrap();
        layer.create_perimeters(&cfg).unwrap();
        layer.create_infill(&cfg);

        let mut buf = Vec::new();
        layer.write_svg(&mut buf).unwrap();
        let svg = String::from_utf8(buf).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("viewBox"));
        assert!(svg.contains("fill-rule=\"evenodd\""));
        assert!(svg.contains("<line"));
        // Millimeter coordinates: the cube corner at -5 mm appears
        assert!(svg.contains("-5.000"));
    }
}
