use ahash::AHashMap;
use glam::Vec3;
use ordered_float::OrderedFloat;

use crate::{ Mesh, Triangle, polygonize::TriangleSink };

type VertexKey = [OrderedFloat<f32>; 3];

#[inline(always)]
fn key(pos: Vec3) -> VertexKey {
    pos.to_array().map(OrderedFloat)
}

/// Builds vertex and index buffers for one meshing pass, giving every
/// distinct position a single index.
///
/// Positions are compared exactly (`-0.0` and `0.0` are the same key).
/// Two computations of the same crossing that differ in the last bit stay
/// separate vertices and leave a seam.
#[derive(Debug, Default)]
pub struct VertexDeduplicator {
    lookup: AHashMap<VertexKey, u32>,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl VertexDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            lookup: AHashMap::with_capacity(triangles),
            vertices: Vec::with_capacity(triangles),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    /// Index of `pos`, appending it as a new vertex on first sight.
    pub fn resolve(&mut self, pos: Vec3) -> u32 {
        let vertices = &mut self.vertices;
        *self.lookup.entry(key(pos)).or_insert_with(|| {
            vertices.push(pos);
            (vertices.len() - 1) as u32
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Forgets every vertex and triangle, keeping the allocations.
    pub fn clear(&mut self) {
        self.lookup.clear();
        self.vertices.clear();
        self.indices.clear();
    }

    /// Hands the buffers over as a mesh and starts a fresh pass.
    pub fn take_mesh(&mut self) -> Mesh {
        self.lookup.clear();
        Mesh {
            vertices: std::mem::take(&mut self.vertices),
            indices: std::mem::take(&mut self.indices),
        }
    }

    pub fn finish(mut self) -> Mesh {
        self.take_mesh()
    }
}

impl TriangleSink for VertexDeduplicator {
    fn push_triangle(&mut self, [a, b, c]: Triangle) {
        let indices = [self.resolve(a), self.resolve(b), self.resolve(c)];
        self.indices.extend(indices);
    }
}

#[test]
fn resolve_is_stable() {
    let mut dedup = VertexDeduplicator::new();
    assert_eq!(dedup.resolve(Vec3::new(0.5, 0.0, 0.0)), 0);
    assert_eq!(dedup.resolve(Vec3::new(0.0, 0.5, 0.0)), 1);
    assert_eq!(dedup.resolve(Vec3::new(0.5, 0.0, 0.0)), 0);
    assert_eq!(dedup.resolve(Vec3::new(-0.0, 0.5, 0.0)), 1);
    assert_eq!(dedup.vertex_count(), 2);
}

#[test]
fn exact_keys_do_not_merge_near_misses() {
    let mut dedup = VertexDeduplicator::new();
    let pos = Vec3::new(0.1, 0.2, 0.3);
    let nudged = Vec3::new(f32::from_bits(0.1f32.to_bits() + 1), 0.2, 0.3);
    assert_ne!(dedup.resolve(pos), dedup.resolve(nudged));
}

#[test]
fn take_mesh_resets_pass() {
    let mut dedup = VertexDeduplicator::new();
    dedup.push_triangle([Vec3::ZERO, Vec3::X, Vec3::Y]);
    dedup.push_triangle([Vec3::Y, Vec3::X, Vec3::Z]);
    assert_eq!(dedup.triangle_count(), 2);

    let mesh = dedup.take_mesh();
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);

    assert_eq!(dedup.vertex_count(), 0);
    assert_eq!(dedup.resolve(Vec3::Z), 0);
}
