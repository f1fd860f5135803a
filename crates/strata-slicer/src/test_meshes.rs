//! Hand-built meshes shared by the unit tests.

use strata_mesh::{BoundingBox, Mesh};

/// Build a mesh from explicit corner positions and triangle indices.
fn mesh_from(corners: &[[f32; 3]], triangles: &[[u32; 3]]) -> Mesh {
    let mut vertices = Vec::with_capacity(corners.len() * 3);
    let mut bounding_box = BoundingBox::empty();
    for c in corners {
        vertices.extend_from_slice(c);
        bounding_box.update(*c);
    }
    let indices: Vec<u32> = triangles.iter().flatten().copied().collect();
    Mesh {
        normals: vec![0.0; vertices.len()],
        facet_count: triangles.len(),
        vertices,
        indices,
        bounding_box,
    }
}

/// Axis-aligned closed box from `min` to `max`, CCW seen from outside.
fn box_triangles(min: [f32; 3], max: [f32; 3]) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let corners = vec![
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let triangles = vec![
        // bottom (normal -z)
        [0, 2, 1],
        [0, 3, 2],
        // top (normal +z)
        [4, 5, 6],
        [4, 6, 7],
        // front y=y0
        [0, 1, 5],
        [0, 5, 4],
        // right x=x1
        [1, 2, 6],
        [1, 6, 5],
        // back y=y1
        [2, 3, 7],
        [2, 7, 6],
        // left x=x0
        [3, 0, 4],
        [3, 4, 7],
    ];
    (corners, triangles)
}

/// A cube resting on the build plate with edge length `size` mm.
pub(crate) fn cube_mesh(size: f32) -> Mesh {
    let (corners, triangles) = box_triangles([0.0, 0.0, 0.0], [size, size, size]);
    mesh_from(&corners, &triangles)
}

/// Right tetrahedron: legs of length `size` along each axis.
pub(crate) fn tetrahedron_mesh(size: f32) -> Mesh {
    let corners = [
        [0.0, 0.0, 0.0],
        [size, 0.0, 0.0],
        [0.0, size, 0.0],
        [0.0, 0.0, size],
    ];
    let triangles = [
        [0, 2, 1], // bottom
        [0, 1, 3], // y=0 face
        [0, 3, 2], // x=0 face
        [1, 2, 3], // slanted face
    ];
    mesh_from(&corners, &triangles)
}

/// A wide box with a narrower box stacked on top, both centered on the
/// same axis. The exposed ring of the wide box's top surface is a
/// mid-stack island.
pub(crate) fn stacked_boxes_mesh(
    wide: f32,
    wide_height: f32,
    narrow: f32,
    narrow_height: f32,
) -> Mesh {
    let (mut corners, mut triangles) = box_triangles(
        [0.0, 0.0, 0.0],
        [wide, wide, wide_height],
    );
    let inset = (wide - narrow) / 2.0;
    let (upper_corners, upper_triangles) = box_triangles(
        [inset, inset, wide_height],
        [inset + narrow, inset + narrow, wide_height + narrow_height],
    );
    let offset = corners.len() as u32;
    corners.extend(upper_corners);
    triangles.extend(
        upper_triangles
            .iter()
            .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
    );
    mesh_from(&corners, &triangles)
}

/// A mesh whose facets all lie below the first layer plane.
pub(crate) fn thin_wafer_mesh() -> Mesh {
    let (corners, triangles) = box_triangles([0.0, 0.0, 0.0], [10.0, 10.0, 0.1]);
    mesh_from(&corners, &triangles)
}
