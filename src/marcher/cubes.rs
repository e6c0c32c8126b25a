use crate::{
    polygonize::march_cube,
    utils::timed,
    MarchParams, Mesh, Result, ValueGrid, VertexDeduplicator,
};

use super::{ Marcher, check_grid, cube_origins };

/// Sequential full-grid marching cubes. Every pass visits every cube and
/// builds a new mesh from scratch.
#[derive(Debug, Default)]
pub struct MarchingCubes {
    dedup: VertexDeduplicator,
}

impl MarchingCubes {
    pub fn new() -> Self {
        Self::default()
    }

    /// One pass over every cube of `params`' range, sharing a single vertex
    /// map across the pass.
    pub fn march_full(&mut self, grid: &ValueGrid, params: &MarchParams) -> Mesh {
        self.dedup.clear();
        for origin in cube_origins(params) {
            march_cube(grid, origin, params.step, params.threshold, params.interpolation, &mut self.dedup);
        }
        self.dedup.take_mesh()
    }
}

impl Marcher for MarchingCubes {
    fn name(&self) -> &'static str {
        "cubes"
    }

    fn march(&mut self, grid: &ValueGrid, params: &MarchParams) -> Result<Mesh> {
        check_grid(grid, params)?;
        let mesh = timed!(self.march_full(grid, params), "full march");
        log::debug!("full march: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
        Ok(mesh)
    }
}

#[cfg(test)]
use glam::{ IVec3, Vec3 };

#[test]
fn single_sample_above_threshold() {
    let mut grid = ValueGrid::new(2).unwrap();
    grid.set(IVec3::ZERO, 1.0);
    let params = crate::MeshingConfig { bound_size: 2, ..Default::default() }.validate().unwrap();

    let mesh = MarchingCubes::new().march(&grid, &params).unwrap();
    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.vertex_count(), 3);
    let mut vertices = mesh.vertices.clone();
    vertices.sort_by(|a, b| a.to_array().partial_cmp(&b.to_array()).unwrap());
    assert_eq!(vertices, vec![
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(0.5, 0.0, 0.0),
    ]);
}

#[test]
fn shared_vertices_are_merged() {
    // A slab of samples above the threshold crosses every cube in the
    // bottom layer, and neighbouring cubes share their crossing vertices.
    let mut grid = ValueGrid::new(4).unwrap();
    for y in 0..4 {
        for x in 0..4 {
            grid.set(IVec3::new(x, y, 0), 1.0);
        }
    }
    let params = crate::MeshingConfig { bound_size: 4, ..Default::default() }.validate().unwrap();
    let mesh = MarchingCubes::new().march(&grid, &params).unwrap();

    // 3x3 cubes, 2 triangles each, on a 4x4 lattice of vertices at z = 0.5
    assert_eq!(mesh.triangle_count(), 18);
    assert_eq!(mesh.vertex_count(), 16);
    assert!(mesh.vertices.iter().all(|v| v.z == 0.5));
}

#[test]
fn mismatched_grid_is_rejected() {
    let grid = ValueGrid::new(3).unwrap();
    let params = crate::MeshingConfig { bound_size: 4, ..Default::default() }.validate().unwrap();
    assert!(MarchingCubes::new().march(&grid, &params).is_err());
}
