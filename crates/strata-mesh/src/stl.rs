//! STL parsing: format detection, the ASCII state machine, and the binary
//! record reader.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;

use crate::error::{MeshError, Result};
use crate::{BoundingBox, Mesh};

/// Load an STL file from disk.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    parse_stl(&path.display().to_string(), &data)
}

/// Parse STL data already in memory. `name` is used in error messages.
///
/// Format detection: if the first two whitespace-stripped lines begin with
/// `solid` and `facet` the file is ASCII, otherwise binary. Checking two
/// lines avoids misreading binary files whose 80-byte header happens to
/// start with the word `solid`.
pub fn parse_stl(name: &str, data: &[u8]) -> Result<Mesh> {
    if looks_ascii(data) {
        parse_ascii(name, &String::from_utf8_lossy(data))
    } else {
        parse_binary(name, data)
    }
}

fn looks_ascii(data: &[u8]) -> bool {
    let mut lines = data.split(|&b| b == b'\n');
    let first = lines.next().map(trim_ascii).unwrap_or(b"");
    let second = lines.next().map(trim_ascii).unwrap_or(b"");
    first.starts_with(b"solid") && second.starts_with(b"facet")
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |e| e + 1);
    &line[start..end]
}

// ---------------------------------------------------------------------------
// Vertex deduplication
// ---------------------------------------------------------------------------

/// Accumulates facets, deduplicating vertices on `(position, normal)`.
struct MeshBuilder {
    seen: HashMap<([u32; 3], [u32; 3]), u32>,
    vertices: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
    bounding_box: BoundingBox,
    facet_count: usize,
}

impl MeshBuilder {
    fn new() -> Self {
        Self {
            seen: HashMap::new(),
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            bounding_box: BoundingBox::empty(),
            facet_count: 0,
        }
    }

    fn add_facet(&mut self, normal: [f32; 3], v1: [f32; 3], v2: [f32; 3], v3: [f32; 3]) {
        let normal = if normal == [0.0, 0.0, 0.0] {
            recover_normal(v1, v2, v3)
        } else {
            normal
        };

        self.add_vertex(v1, normal);
        self.add_vertex(v2, normal);
        self.add_vertex(v3, normal);

        self.bounding_box.update(v1);
        self.bounding_box.update(v2);
        self.bounding_box.update(v3);

        self.facet_count += 1;
    }

    fn add_vertex(&mut self, v: [f32; 3], n: [f32; 3]) {
        let key = (v.map(f32::to_bits), n.map(f32::to_bits));
        let index = match self.seen.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = (self.vertices.len() / 3) as u32;
                entry.insert(index);
                self.vertices.extend_from_slice(&v);
                self.normals.extend_from_slice(&n);
                index
            }
        };
        self.indices.push(index);
    }

    fn finish(self) -> Result<Mesh> {
        if self.facet_count == 0 {
            return Err(MeshError::EmptyMesh);
        }
        log::debug!(
            "loaded {} facets, {} unique vertices",
            self.facet_count,
            self.vertices.len() / 3
        );
        Ok(Mesh {
            vertices: self.vertices,
            normals: self.normals,
            indices: self.indices,
            bounding_box: self.bounding_box,
            facet_count: self.facet_count,
        })
    }
}

/// Normal from the facet winding, for facets stored with a zero normal.
fn recover_normal(v1: [f32; 3], v2: [f32; 3], v3: [f32; 3]) -> [f32; 3] {
    let a = Vector3::new(v2[0] - v1[0], v2[1] - v1[1], v2[2] - v1[2]);
    let b = Vector3::new(v3[0] - v1[0], v3[1] - v1[1], v3[2] - v1[2]);
    let cross = a.cross(&b);
    let len = cross.norm();
    if len > 0.0 {
        [cross.x / len, cross.y / len, cross.z / len]
    } else {
        // Degenerate facet, the slicer drops it anyway
        [0.0, 0.0, 0.0]
    }
}

// ---------------------------------------------------------------------------
// ASCII parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Solid,
    FacetNormal,
    OuterLoop,
    Vertex1,
    Vertex2,
    Vertex3,
    EndLoop,
    Done,
}

struct AsciiParser<'a> {
    file: &'a str,
    line_no: usize,
    state: State,
    normal: [f32; 3],
    vertex1: [f32; 3],
    vertex2: [f32; 3],
    vertex3: [f32; 3],
    builder: MeshBuilder,
}

fn parse_ascii(file: &str, text: &str) -> Result<Mesh> {
    let mut parser = AsciiParser {
        file,
        line_no: 0,
        state: State::Start,
        normal: [0.0; 3],
        vertex1: [0.0; 3],
        vertex2: [0.0; 3],
        vertex3: [0.0; 3],
        builder: MeshBuilder::new(),
    };

    for line in text.lines() {
        parser.line_no += 1;
        parser.step(line.trim())?;
        if parser.state == State::Done {
            break;
        }
    }

    if parser.state != State::Done {
        return Err(parser.expected("keyword 'endsolid'"));
    }

    parser.builder.finish()
}

impl AsciiParser<'_> {
    fn step(&mut self, line: &str) -> Result<()> {
        match self.state {
            State::Start => self.do_start(line),
            State::Solid => self.do_solid(line),
            State::FacetNormal => self.do_facet_normal(line),
            State::OuterLoop => self.do_vertex(line, State::Vertex1),
            State::Vertex1 => self.do_vertex(line, State::Vertex2),
            State::Vertex2 => self.do_vertex(line, State::Vertex3),
            State::Vertex3 => self.do_endloop(line),
            State::EndLoop => self.do_endfacet(line),
            State::Done => Ok(()),
        }
    }

    fn do_start(&mut self, line: &str) -> Result<()> {
        if !line.starts_with("solid") {
            return Err(self.expected("keyword 'solid'"));
        }
        self.state = State::Solid;
        Ok(())
    }

    fn do_solid(&mut self, line: &str) -> Result<()> {
        if line.starts_with("endsolid") {
            self.state = State::Done;
            return Ok(());
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 5 || tokens[0] != "facet" || tokens[1] != "normal" {
            return Err(self.expected("keyword 'facet normal'"));
        }
        self.normal = self.parse_triplet(&tokens[2..])?;
        self.state = State::FacetNormal;
        Ok(())
    }

    fn do_facet_normal(&mut self, line: &str) -> Result<()> {
        if line != "outer loop" {
            return Err(self.expected("keyword 'outer loop'"));
        }
        self.state = State::OuterLoop;
        Ok(())
    }

    fn do_vertex(&mut self, line: &str, next: State) -> Result<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 4 || tokens[0] != "vertex" {
            return Err(self.expected("keyword 'vertex'"));
        }
        let v = self.parse_triplet(&tokens[1..])?;
        match next {
            State::Vertex1 => self.vertex1 = v,
            State::Vertex2 => self.vertex2 = v,
            State::Vertex3 => self.vertex3 = v,
            _ => {}
        }
        self.state = next;
        Ok(())
    }

    fn do_endloop(&mut self, line: &str) -> Result<()> {
        if line != "endloop" {
            return Err(self.expected("keyword 'endloop'"));
        }
        self.builder
            .add_facet(self.normal, self.vertex1, self.vertex2, self.vertex3);
        self.state = State::EndLoop;
        Ok(())
    }

    fn do_endfacet(&mut self, line: &str) -> Result<()> {
        if line != "endfacet" {
            return Err(self.expected("keyword 'endfacet'"));
        }
        self.state = State::Solid;
        Ok(())
    }

    fn parse_triplet(&self, tokens: &[&str]) -> Result<[f32; 3]> {
        let mut out = [0.0f32; 3];
        for (slot, token) in out.iter_mut().zip(tokens) {
            *slot = token
                .parse()
                .map_err(|_| self.expected("decimal number"))?;
        }
        Ok(out)
    }

    fn expected(&self, what: &str) -> MeshError {
        MeshError::Parse {
            file: self.file.to_string(),
            line: self.line_no,
            expected: what.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Binary parser
// ---------------------------------------------------------------------------

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

fn parse_binary(file: &str, data: &[u8]) -> Result<Mesh> {
    if data.len() < HEADER_LEN + 4 {
        return Err(MeshError::Truncated {
            file: file.to_string(),
            offset: data.len(),
        });
    }

    // Facet count field is advisory only; the record stream decides.
    let declared = read_u32(data, HEADER_LEN) as usize;

    let body = &data[HEADER_LEN + 4..];
    let partial = body.len() % RECORD_LEN;
    if partial != 0 {
        return Err(MeshError::Truncated {
            file: file.to_string(),
            offset: data.len() - partial,
        });
    }

    let mut builder = MeshBuilder::new();
    for record in body.chunks_exact(RECORD_LEN) {
        let normal = read_vec3(record, 0);
        let v1 = read_vec3(record, 12);
        let v2 = read_vec3(record, 24);
        let v3 = read_vec3(record, 36);
        // Final 2 bytes are the attribute count, ignored
        builder.add_facet(normal, v1, v2, v3);
    }

    if declared != builder.facet_count {
        log::debug!(
            "{file}: header declares {declared} facets, file contains {}",
            builder.facet_count
        );
    }

    builder.finish()
}

fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn read_f32(data: &[u8], off: usize) -> f32 {
    f32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn read_vec3(data: &[u8], off: usize) -> [f32; 3] {
    [
        read_f32(data, off),
        read_f32(data, off + 4),
        read_f32(data, off + 8),
    ]
}
