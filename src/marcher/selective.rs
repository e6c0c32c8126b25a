use ahash::{ AHashMap, AHashSet };
use bitvec::prelude::*;
use glam::IVec3;

use crate::{
    polygonize::{ CubeWindow, TriangleSink, config_index_from, march_cube, polygonize },
    tool::Action,
    utils::timed,
    MarchParams, Mesh, Result, ValueGrid, VertexDeduplicator,
};

use super::{ CubeTriangles, Marcher, check_grid, cube_count, cube_id, cube_origins };

/// Where a selective pass reads corner membership from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Membership {
    /// A corner is inside when its sample is above the threshold.
    #[default]
    Threshold,
    /// A corner is inside when an Add edit painted it and no Remove edit
    /// has cleared it since. Vertices land on edge midpoints.
    Painted,
}

/// Offsets from a grid point to the origins of the 8 cubes sharing it.
const SHARING_CUBES: [IVec3; 8] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 0, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 0, 0),
];

/// Marching cubes that only revisits cubes around edited points.
///
/// The first pass after construction or [`Marcher::invalidate`] covers the
/// whole grid and stores the triangles of every cube. After that, each pass
/// re-marches exactly the cubes with a corner on a point marked dirty since
/// the previous pass, each cube at most once, and replaces their stored
/// triangles. Every pass returns the mesh of the whole store, which matches
/// a full pass over the current grid.
#[derive(Debug, Default)]
pub struct SelectiveCubes {
    membership: Membership,
    dirty: AHashSet<IVec3>,
    painted: AHashSet<IVec3>,
    /// Non-empty cubes by id.
    cubes: AHashMap<usize, CubeTriangles>,
    marched: BitVec,
    baseline: bool,
    dedup: VertexDeduplicator,
}

impl SelectiveCubes {
    pub fn new(membership: Membership) -> Self {
        Self {
            membership,
            ..Default::default()
        }
    }

    #[inline]
    pub fn membership(&self) -> Membership {
        self.membership
    }

    /// Whether the next pass will be a full one.
    #[inline]
    pub fn needs_baseline(&self) -> bool {
        !self.baseline
    }

    /// Points waiting for the next pass.
    #[inline]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Cubes currently holding triangles.
    #[inline]
    pub fn stored_cubes(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_painted(&self, point: IVec3) -> bool {
        self.painted.contains(&point)
    }

    /// Re-marches one cube and replaces what the store holds for it.
    fn refresh_cube(&mut self, grid: &ValueGrid, params: &MarchParams, id: usize, origin: IVec3) {
        let mut triangles = CubeTriangles::new();
        march_member(self.membership, &self.painted, grid, params, origin, &mut triangles);
        if triangles.is_empty() {
            self.cubes.remove(&id);
        } else {
            self.cubes.insert(id, triangles);
        }
    }

    fn march_full(&mut self, grid: &ValueGrid, params: &MarchParams) {
        self.cubes.clear();
        for (id, origin) in cube_origins(params).enumerate() {
            self.refresh_cube(grid, params, id, origin);
        }
    }

    fn march_dirty(&mut self, grid: &ValueGrid, params: &MarchParams) {
        self.marched.clear();
        self.marched.resize(cube_count(params), false);

        // Sorted so a pass is reproducible regardless of hash order
        let mut dirty: Vec<IVec3> = self.dirty.drain().collect();
        dirty.sort_unstable_by_key(|p| (p.z, p.y, p.x));

        let mut visited = 0;
        for point in dirty {
            for offset in SHARING_CUBES {
                let origin = point + offset;
                let Some(id) = cube_id(params, origin) else {
                    continue;
                };
                if self.marched.replace(id, true) {
                    continue;
                }
                visited += 1;
                self.refresh_cube(grid, params, id, origin);
            }
        }
        log::trace!("selective march visited {visited} cubes");
    }

    /// Indexed mesh of every stored cube, in full pass order.
    fn build_mesh(&mut self) -> Mesh {
        let mut ids: Vec<usize> = self.cubes.keys().copied().collect();
        ids.sort_unstable();

        self.dedup.clear();
        for id in ids {
            if let Some(triangles) = self.cubes.get(&id) {
                triangles.iter().for_each(|&triangle| self.dedup.push_triangle(triangle));
            }
        }
        self.dedup.take_mesh()
    }
}

fn march_member<S: TriangleSink + ?Sized>(
    membership: Membership,
    painted: &AHashSet<IVec3>,
    grid: &ValueGrid,
    params: &MarchParams,
    origin: IVec3,
    sink: &mut S,
) {
    match membership {
        Membership::Threshold => {
            march_cube(grid, origin, params.step, params.threshold, params.interpolation, sink);
        },
        Membership::Painted => {
            let points = CubeWindow::corner_points(origin);
            let inside = points.map(|point| painted.contains(&point));
            let config = config_index_from(|corner| inside[corner]);
            let window = CubeWindow {
                corners: points.map(|point| point.as_vec3() * params.step),
                values: inside.map(|i| if i { 1.0 } else { 0.0 }),
            };
            polygonize(config, &window, 0.5, params.interpolation, sink);
        },
    }
}

impl Marcher for SelectiveCubes {
    fn name(&self) -> &'static str {
        "selective-cubes"
    }

    fn march(&mut self, grid: &ValueGrid, params: &MarchParams) -> Result<Mesh> {
        check_grid(grid, params)?;
        if self.baseline {
            timed!(self.march_dirty(grid, params), "selective march");
        } else {
            self.dirty.clear();
            self.baseline = true;
            timed!(self.march_full(grid, params), "baseline march");
        }
        let mesh = self.build_mesh();
        log::debug!("{}: {} vertices, {} triangles", self.name(), mesh.vertex_count(), mesh.triangle_count());
        Ok(mesh)
    }

    fn mark_dirty(&mut self, points: &[IVec3], action: Action) {
        self.dirty.extend(points.iter().copied());
        if self.membership == Membership::Painted {
            match action {
                Action::Add => self.painted.extend(points.iter().copied()),
                Action::Remove => points.iter().for_each(|point| {
                    self.painted.remove(point);
                }),
            }
        }
    }

    fn invalidate(&mut self) {
        self.baseline = false;
        self.dirty.clear();
        self.cubes.clear();
    }
}

#[cfg(test)]
fn test_params(bound_size: i32) -> MarchParams {
    crate::MeshingConfig { bound_size, ..Default::default() }.validate().unwrap()
}

#[cfg(test)]
fn sorted_triangles(mesh: &Mesh) -> Vec<[[f32; 3]; 3]> {
    let mut triangles: Vec<_> = mesh.triangles().map(|tri| tri.map(|v| v.to_array())).collect();
    triangles.sort_by(|a, b| a.partial_cmp(b).unwrap());
    triangles
}

#[test]
fn first_pass_is_full() {
    let mut grid = ValueGrid::new(6).unwrap();
    grid.apply_brush(IVec3::splat(3), 2.0, 1.0);
    let params = test_params(6);

    let mut selective = SelectiveCubes::new(Membership::Threshold);
    assert!(selective.needs_baseline());
    let baseline = selective.march(&grid, &params).unwrap();
    let full = super::MarchingCubes::new().march_full(&grid, &params);
    assert_eq!(sorted_triangles(&baseline), sorted_triangles(&full));
    assert!(!selective.needs_baseline());

    // Nothing dirty, the stored mesh comes back unchanged
    let again = selective.march(&grid, &params).unwrap();
    assert_eq!(again, baseline);
}

#[test]
fn dirty_pass_covers_each_cube_once() {
    let mut grid = ValueGrid::new(8).unwrap();
    let params = test_params(8);
    let mut selective = SelectiveCubes::new(Membership::Threshold);
    selective.march(&grid, &params).unwrap();

    let touched = grid.apply_brush(IVec3::splat(4), 2.0, 1.0);
    selective.mark_dirty(&touched, Action::Add);
    assert_eq!(selective.dirty_count(), touched.len());

    // The edit sits well inside the grid, so the patch holds the whole surface
    let patch = selective.march(&grid, &params).unwrap();
    let full = super::MarchingCubes::new().march_full(&grid, &params);
    assert!(!patch.is_empty());
    assert_eq!(sorted_triangles(&patch), sorted_triangles(&full));
    assert_eq!(selective.dirty_count(), 0);
}

#[test]
fn distant_edits_accumulate() {
    let mut grid = ValueGrid::new(16).unwrap();
    let params = test_params(16);
    let mut selective = SelectiveCubes::new(Membership::Threshold);
    selective.march(&grid, &params).unwrap();

    let first = grid.apply_brush(IVec3::splat(3), 2.0, 1.0);
    selective.mark_dirty(&first, Action::Add);
    let one_blob = selective.march(&grid, &params).unwrap();

    let second = grid.apply_brush(IVec3::splat(12), 2.0, 1.0);
    selective.mark_dirty(&second, Action::Add);
    let two_blobs = selective.march(&grid, &params).unwrap();

    // The first blob survives the second edit
    assert_eq!(two_blobs.triangle_count(), one_blob.triangle_count() * 2);
    let full = super::MarchingCubes::new().march_full(&grid, &params);
    assert_eq!(sorted_triangles(&two_blobs), sorted_triangles(&full));
    assert_eq!(two_blobs.vertex_count(), full.vertex_count());

    // Removing one blob drops only its cubes from the store
    let removed = grid.apply_brush(IVec3::splat(3), 2.0, -1.0);
    selective.mark_dirty(&removed, Action::Remove);
    let remaining = selective.march(&grid, &params).unwrap();
    assert_eq!(remaining.triangle_count(), one_blob.triangle_count());
    assert!(remaining.vertices.iter().all(|v| v.min_element() > 8.0));
    assert_eq!(sorted_triangles(&remaining), sorted_triangles(&super::MarchingCubes::new().march_full(&grid, &params)));
}

#[test]
fn padded_corner_edit_matches_full_pass() {
    let config = crate::MeshingConfig { bound_size: 5, boundary: crate::Boundary::Padded, ..Default::default() };
    let params = config.validate().unwrap();
    let mut grid = ValueGrid::new(5).unwrap();
    let mut selective = SelectiveCubes::new(Membership::Threshold);
    assert!(selective.march(&grid, &params).unwrap().is_empty());

    // Both extreme corners: their sharing cubes reach origins -1 and N-1
    for corner in [IVec3::ZERO, IVec3::splat(4)] {
        assert!(grid.set(corner, 1.0));
        selective.mark_dirty(&[corner], Action::Add);
    }
    let mesh = selective.march(&grid, &params).unwrap();
    let full = super::MarchingCubes::new().march_full(&grid, &params);
    // A lone sample closes into an octahedron of 8 triangles
    assert_eq!(full.triangle_count(), 16);
    assert_eq!(sorted_triangles(&mesh), sorted_triangles(&full));
    assert_eq!(selective.stored_cubes(), 16);
    assert!(mesh.vertices.iter().any(|v| v.min_element() == -0.5));
    assert!(mesh.vertices.iter().any(|v| v.max_element() == 4.5));
}

#[test]
fn invalidate_forces_baseline() {
    let grid = ValueGrid::new(4).unwrap();
    let params = test_params(4);
    let mut selective = SelectiveCubes::new(Membership::Threshold);
    selective.march(&grid, &params).unwrap();
    selective.mark_dirty(&[IVec3::ONE], Action::Add);
    selective.invalidate();
    assert!(selective.needs_baseline());
    assert_eq!(selective.dirty_count(), 0);
    assert_eq!(selective.stored_cubes(), 0);
}

#[test]
fn painted_membership_follows_edits() {
    let grid = ValueGrid::new(4).unwrap();
    let params = test_params(4);
    let mut selective = SelectiveCubes::new(Membership::Painted);
    assert!(selective.march(&grid, &params).unwrap().is_empty());

    // Painting one point gives the 8 cubes sharing it one triangle each,
    // even though the grid itself is empty
    selective.mark_dirty(&[IVec3::ONE], Action::Add);
    assert!(selective.is_painted(IVec3::ONE));
    let mesh = selective.march(&grid, &params).unwrap();
    assert_eq!(mesh.triangle_count(), 8);
    assert_eq!(mesh.vertex_count(), 6);

    selective.mark_dirty(&[IVec3::ONE], Action::Remove);
    assert!(!selective.is_painted(IVec3::ONE));
    assert!(selective.march(&grid, &params).unwrap().is_empty());
}
