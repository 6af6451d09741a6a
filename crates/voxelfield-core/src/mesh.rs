//! Mesh assembly from appended triangle records.

use glam::{Vec3, Vec4};

use crate::triangulate::Triangle;

/// Unshared triangle-soup mesh produced from the triangulation output.
///
/// Vertices are never merged: triangle `i` owns vertices `3i .. 3i + 3`
/// and `indices` is always the identity sequence `0 .. 3n`.
#[derive(Debug, Clone, Default)]
pub struct TerrainMesh {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drops the previous contents while keeping allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.normals.clear();
        self.indices.clear();
    }
}

/// Rebuilds `mesh` from the triangle records of one pipeline run.
///
/// The previous contents are discarded first, so a run that produced zero
/// triangles leaves an empty mesh. Colors are the grayscale of each
/// triangle's density value and normals are flat per-face normals.
pub fn assemble_mesh(mesh: &mut TerrainMesh, triangles: &[Triangle]) {
    mesh.clear();
    let vertex_count = triangles.len() * 3;
    mesh.positions.reserve(vertex_count);
    mesh.colors.reserve(vertex_count);
    mesh.normals.reserve(vertex_count);
    mesh.indices.reserve(vertex_count);

    for tri in triangles {
        let a = Vec3::new(tri.a[0], tri.a[1], tri.a[2]);
        let b = Vec3::new(tri.b[0], tri.b[1], tri.b[2]);
        let c = Vec3::new(tri.c[0], tri.c[1], tri.c[2]);
        let normal = (b - a).cross(c - a).normalize_or_zero();

        for (p, w) in [(a, tri.a[3]), (b, tri.b[3]), (c, tri.c[3])] {
            mesh.indices.push(mesh.positions.len() as u32);
            mesh.positions.push(p);
            mesh.colors.push(Vec4::new(w, w, w, 1.0));
            mesh.normals.push(normal);
        }
    }
}
