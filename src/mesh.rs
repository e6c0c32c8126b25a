use std::{
    fs::File,
    io::{ self, BufWriter, Write },
    path::Path,
};

use glam::Vec3;

use crate::{ polygonize::TriangleSink, VertexDeduplicator };

/// Three vertex positions.
pub type Triangle = [Vec3; 3];

/// Triangle soup, as produced by a parallel meshing pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnindexedMesh {
    pub faces: Vec<Triangle>,
}

impl UnindexedMesh {
    /// Merges equal positions while scanning the faces in order.
    pub fn index(&self) -> Mesh {
        let mut dedup = VertexDeduplicator::with_capacity(self.faces.len());
        self.faces.iter().for_each(|&face| dedup.push_triangle(face));
        dedup.finish()
    }
}

/// Indexed triangle mesh. Every 3 consecutive indices form one triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions of each triangle, in index order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    pub fn write_obj<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for v in &self.vertices {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for tri in self.indices.chunks_exact(3) {
            // OBJ indices are 1-based
            writeln!(out, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
        }
        Ok(())
    }

    pub fn write_obj_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_obj(&mut out)?;
        out.flush()
    }
}

#[test]
fn index_merges_shared_vertices() {
    let a = Vec3::ZERO;
    let b = Vec3::X;
    let c = Vec3::Y;
    let d = Vec3::ONE;
    let soup = UnindexedMesh { faces: vec![[a, b, c], [c, b, d]] };

    let mesh = soup.index();
    assert_eq!(mesh.vertices, vec![a, b, c, d]);
    assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.triangles().collect::<Vec<_>>(), soup.faces);
}

#[test]
fn obj_export() {
    let mesh = UnindexedMesh { faces: vec![[Vec3::ZERO, Vec3::X, Vec3::Y]] }.index();
    let mut out = Vec::new();
    mesh.write_obj(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
}
