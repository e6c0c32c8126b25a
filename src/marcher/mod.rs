//! Meshing strategies.
//!
//! Every strategy walks the same cubes for a given [`MarchParams`] and runs
//! the same classification and polygonization, so for one grid they agree
//! on the triangle set. They differ in how much of the grid they visit and
//! where the work runs.

mod cubes;
pub use cubes::*;

mod selective;
pub use selective::*;

mod parallel;
pub use parallel::*;

use glam::IVec3;

use crate::{
    tool::Action,
    ConfigError, Error, MarchParams, Mesh, Result, ValueGrid,
};

/// A way of turning a value grid into a mesh.
pub trait Marcher {
    fn name(&self) -> &'static str;

    /// Runs one meshing pass. Blocks until the mesh is complete.
    fn march(&mut self, grid: &ValueGrid, params: &MarchParams) -> Result<Mesh>;

    /// Tells the strategy which grid points an edit touched. Strategies that
    /// always remesh the whole grid ignore this.
    fn mark_dirty(&mut self, _points: &[IVec3], _action: Action) {}

    /// Drops any state carried between passes, so the next pass starts from
    /// scratch.
    fn invalidate(&mut self) {}
}

/// Strategies an [`EditSession`](crate::EditSession) can switch between.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyKind {
    /// Full sequential pass on every remesh.
    #[default]
    Cubes,
    /// Full pass first, then only the cubes around edited points.
    SelectiveCubes { membership: Membership },
    /// Full pass with one task per cube.
    Parallel,
    /// Sparse volume backed by an octree. Not implemented.
    SparseOctree,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Cubes => "cubes",
            StrategyKind::SelectiveCubes { .. } => "selective-cubes",
            StrategyKind::Parallel => "parallel-cubes",
            StrategyKind::SparseOctree => "sparse-octree",
        }
    }

    /// Builds a fresh strategy of this kind.
    pub fn create(&self) -> Result<Box<dyn Marcher>> {
        Ok(match *self {
            StrategyKind::Cubes => Box::new(MarchingCubes::new()),
            StrategyKind::SelectiveCubes { membership } => Box::new(SelectiveCubes::new(membership)),
            StrategyKind::Parallel => Box::new(ParallelCubes::new(default_accelerator()?)),
            StrategyKind::SparseOctree => return Err(Error::UnimplementedStrategy(self.name())),
        })
    }
}

/// Fails when the grid is not the size the parameters describe.
pub(crate) fn check_grid(grid: &ValueGrid, params: &MarchParams) -> std::result::Result<(), ConfigError> {
    if grid.bound_size() != params.bound_size {
        return Err(ConfigError::GridLengthMismatch {
            expected: params.bound_size.pow(3),
            got: grid.as_slice().len(),
        });
    }
    Ok(())
}

/// Number of cubes a full pass visits.
#[inline]
pub fn cube_count(params: &MarchParams) -> usize {
    params.cubes_per_axis().pow(3)
}

/// Origin of the cube with linear id `id`, x varying fastest.
#[inline]
pub fn cube_origin(params: &MarchParams, id: usize) -> IVec3 {
    let per_axis = params.cubes_per_axis();
    let start = params.cube_range().start;
    IVec3::new(
        (id % per_axis) as i32,
        (id / per_axis % per_axis) as i32,
        (id / (per_axis * per_axis)) as i32,
    ) + start
}

/// Linear id of the cube at `origin`, if a full pass visits it.
#[inline]
pub fn cube_id(params: &MarchParams, origin: IVec3) -> Option<usize> {
    let range = params.cube_range();
    if !origin.to_array().iter().all(|c| range.contains(c)) {
        return None;
    }
    let per_axis = params.cubes_per_axis();
    let local = (origin - range.start).as_uvec3();
    Some(local.x as usize + local.y as usize * per_axis + local.z as usize * per_axis * per_axis)
}

/// Every cube origin of a full pass, x varying fastest.
pub fn cube_origins(params: &MarchParams) -> impl Iterator<Item = IVec3> {
    let range = params.cube_range();
    range.clone().flat_map(move |z| {
        let xs = range.clone();
        range.clone().flat_map(move |y| xs.clone().map(move |x| IVec3::new(x, y, z)))
    })
}

#[cfg(test)]
fn params(bound_size: i32, boundary: crate::Boundary) -> MarchParams {
    crate::MeshingConfig { bound_size, boundary, ..Default::default() }
        .validate()
        .unwrap()
}

#[test]
fn cube_ids_round_trip() {
    for boundary in [crate::Boundary::Interior, crate::Boundary::Padded] {
        let params = params(4, boundary);
        let origins: Vec<IVec3> = cube_origins(&params).collect();
        assert_eq!(origins.len(), cube_count(&params));
        for (id, &origin) in origins.iter().enumerate() {
            assert_eq!(cube_origin(&params, id), origin);
            assert_eq!(cube_id(&params, origin), Some(id));
        }
    }
}

#[test]
fn cube_order_is_x_fastest() {
    let params = params(3, crate::Boundary::Interior);
    let origins: Vec<IVec3> = cube_origins(&params).collect();
    assert_eq!(origins[..3], [IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(0, 1, 0)]);
    assert_eq!(cube_id(&params, IVec3::new(2, 0, 0)), None);
    assert_eq!(cube_id(&params, IVec3::new(-1, 0, 0)), None);
}

#[test]
fn sparse_octree_fails_loudly() {
    assert_eq!(
        StrategyKind::SparseOctree.create().err(),
        Some(Error::UnimplementedStrategy("sparse-octree"))
    );
    assert_eq!(StrategyKind::Cubes.create().unwrap().name(), "cubes");
}
