//! Command-line STL slicer: load a mesh, slice it, report per-layer
//! statistics and optionally export layers as SVG.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use strata_slicer::{slice, SlicerConfig, VERTEX_PRECISION};

#[derive(Parser)]
#[command(name = "strata", about = "Slice an STL mesh into printing toolpaths")]
struct Args {
    /// STL file to slice (ASCII or binary).
    stl: PathBuf,

    /// JSON slicer configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write one SVG per layer into.
    #[arg(long)]
    svg_dir: Option<PathBuf>,

    /// Print a statistics line for every layer.
    #[arg(long)]
    per_layer: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<SlicerConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SlicerConfig::default(),
    };

    let mesh = strata_mesh::load_mesh(&args.stl)
        .with_context(|| format!("loading {}", args.stl.display()))?;
    eprintln!(
        "{}: {} facets, {} vertices, bounds {}",
        args.stl.display(),
        mesh.facet_count,
        mesh.num_vertices(),
        mesh.bounding_box
    );

    let mut progress = |percent: u32, msg: &str| {
        eprint!("\r[{percent:>3}%] {msg}        ");
        let _ = io::stderr().flush();
        false
    };

    let mut model = slice(&mesh, &config, Some(&mut progress))?;
    eprintln!();
    model.create_perimeters(Some(&mut progress))?;
    model.create_infill(Some(&mut progress))?;
    eprintln!();

    let perimeter_paths: usize = model
        .layers
        .iter()
        .map(|l| l.perimeters.iter().map(Vec::len).sum::<usize>())
        .sum();
    let infill_lines: usize = model.layers.iter().map(|l| l.infill.len()).sum();
    println!(
        "{} layers, {} perimeter paths ({} vertices), {} infill lines",
        model.layer_count(),
        perimeter_paths,
        model.node_count(),
        infill_lines
    );
    if model.degenerate_triangles > 0 {
        println!("{} degenerate triangles skipped", model.degenerate_triangles);
    }

    if args.per_layer {
        for layer in &model.layers {
            println!(
                "layer {:4}  z {:8.3} mm  outlines {:2}  rings {}  infill {}",
                layer.layer_no,
                layer.z as f64 / VERTEX_PRECISION as f64,
                layer.outlines.len(),
                layer.perimeters.len(),
                layer.infill.len()
            );
        }
    }

    if let Some(dir) = &args.svg_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for layer in &model.layers {
            let path = dir.join(format!("layer_{:04}.svg", layer.layer_no));
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            layer.write_svg(&mut file)?;
        }
        println!("wrote {} SVG files to {}", model.layer_count(), dir.display());
    }

    Ok(())
}
