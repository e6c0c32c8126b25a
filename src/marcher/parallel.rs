use std::time::Instant;

use arrayvec::ArrayVec;

use crate::{
    grid::flat_get,
    polygonize::{ CubeWindow, config_index, polygonize },
    tables::MAX_CUBE_TRIANGLES,
    utils::{ MarchStats, timed },
    ConfigError, MarchParams, Mesh, Result, Triangle, UnindexedMesh, ValueGrid,
};

use super::{ Marcher, check_grid, cube_count, cube_origin };

/// Triangles of a single cube.
pub type CubeTriangles = ArrayVec<Triangle, MAX_CUBE_TRIANGLES>;

/// Evaluates the cube with linear id `id` over a flattened grid and pushes
/// its triangles, as explicit vertex triples, into `out`.
///
/// Touches nothing but its arguments, so any number of cubes can run at
/// once.
#[inline]
pub fn cube_kernel(values: &[f32], params: &MarchParams, id: usize, out: &mut CubeTriangles) {
    let origin = cube_origin(params, id);
    let window = CubeWindow::sample_with(origin, params.step, |pos| flat_get(values, params.bound_size, pos));
    let config = config_index(&window.values, params.threshold);
    polygonize(config, &window, params.threshold, params.interpolation, out);
}

/// Execution context that runs [`cube_kernel`] for every cube of a pass.
///
/// Triangles come back in no particular order.
pub trait Accelerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one pass over `values`, a flattened grid of
    /// `params.bound_size³` samples, and returns every emitted triangle.
    fn dispatch(&self, values: &[f32], params: &MarchParams) -> Vec<Triangle>;
}

/// Runs the kernel on the calling thread, in cube order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialAccelerator;

impl Accelerator for SerialAccelerator {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn dispatch(&self, values: &[f32], params: &MarchParams) -> Vec<Triangle> {
        let mut faces = Vec::new();
        let mut local = CubeTriangles::new();
        for id in 0..cube_count(params) {
            cube_kernel(values, params, id, &mut local);
            faces.extend(local.drain(..));
        }
        faces
    }
}

#[cfg(feature = "multi-thread")]
pub use multi_thread::*;

#[cfg(feature = "multi-thread")]
mod multi_thread {
    use std::sync::atomic::{ AtomicUsize, Ordering };

    use lockfree::queue::Queue;
    use rayon::prelude::*;

    use super::*;

    /// Shared append-only triangle buffer with a counter of appended
    /// records.
    struct AppendBuffer {
        queue: Queue<Triangle>,
        count: AtomicUsize,
    }

    impl AppendBuffer {
        fn new() -> Self {
            Self {
                queue: Queue::new(),
                count: AtomicUsize::new(0),
            }
        }

        fn append<I: IntoIterator<Item = Triangle>>(&self, triangles: I) {
            for triangle in triangles {
                self.queue.push(triangle);
                self.count.fetch_add(1, Ordering::Relaxed);
            }
        }

        /// Reads back exactly as many records as were counted.
        fn read_back(self) -> Vec<Triangle> {
            let count = self.count.into_inner();
            let mut faces = Vec::with_capacity(count);
            faces.extend(std::iter::from_fn(|| self.queue.pop()).take(count));
            faces
        }
    }

    /// Runs one kernel task per cube on a dedicated rayon pool.
    pub struct RayonAccelerator {
        pool: rayon::ThreadPool,
    }

    impl RayonAccelerator {
        /// Pool with one thread per core.
        pub fn new() -> std::result::Result<Self, ConfigError> {
            Self::with_threads(0)
        }

        /// Pool with `threads` workers, or one per core if 0.
        pub fn with_threads(threads: usize) -> std::result::Result<Self, ConfigError> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|index| format!("march-worker-{index}"))
                .build()
                .map_err(|err| ConfigError::AcceleratorUnavailable(err.to_string()))?;
            log::debug!("rayon accelerator with {} threads", pool.current_num_threads());
            Ok(Self { pool })
        }

        pub fn threads(&self) -> usize {
            self.pool.current_num_threads()
        }
    }

    impl std::fmt::Debug for RayonAccelerator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RayonAccelerator")
                .field("threads", &self.threads())
                .finish()
        }
    }

    impl Accelerator for RayonAccelerator {
        fn name(&self) -> &'static str {
            "rayon"
        }

        fn dispatch(&self, values: &[f32], params: &MarchParams) -> Vec<Triangle> {
            let buffer = AppendBuffer::new();
            self.pool.install(|| {
                (0..cube_count(params))
                    .into_par_iter()
                    .for_each_init(CubeTriangles::new, |local, id| {
                        cube_kernel(values, params, id, local);
                        buffer.append(local.drain(..));
                    });
            });
            buffer.read_back()
        }
    }

    #[test]
    fn append_buffer_counts() {
        let buffer = AppendBuffer::new();
        let tri = [glam::Vec3::ZERO, glam::Vec3::X, glam::Vec3::Y];
        (0..100).into_par_iter().for_each(|_| buffer.append([tri, tri]));
        let faces = buffer.read_back();
        assert_eq!(faces.len(), 200);
        assert!(faces.iter().all(|&face| face == tri));
    }
}

/// The accelerator [`StrategyKind::Parallel`](super::StrategyKind) uses.
#[cfg(feature = "multi-thread")]
pub fn default_accelerator() -> std::result::Result<Box<dyn Accelerator>, ConfigError> {
    Ok(Box::new(RayonAccelerator::new()?))
}

/// The accelerator [`StrategyKind::Parallel`](super::StrategyKind) uses.
#[cfg(not(feature = "multi-thread"))]
pub fn default_accelerator() -> std::result::Result<Box<dyn Accelerator>, ConfigError> {
    Err(ConfigError::AcceleratorUnavailable("built without the `multi-thread` feature".into()))
}

/// Full-grid marching cubes dispatched through an [`Accelerator`].
///
/// The accelerator returns a flat triangle stream; vertices are merged
/// afterwards by scanning it in order. The triangle set matches
/// [`MarchingCubes`](super::MarchingCubes), the vertex order does not.
pub struct ParallelCubes {
    accelerator: Box<dyn Accelerator>,
    stats: MarchStats,
}

impl ParallelCubes {
    pub fn new(accelerator: Box<dyn Accelerator>) -> Self {
        Self {
            accelerator,
            stats: MarchStats::default(),
        }
    }

    pub fn accelerator(&self) -> &dyn Accelerator {
        self.accelerator.as_ref()
    }

    /// Timings of every pass this strategy has run.
    pub fn stats(&self) -> MarchStats {
        self.stats
    }

    /// One pass, without merging vertices.
    pub fn march_unindexed(&mut self, grid: &ValueGrid, params: &MarchParams) -> Result<UnindexedMesh> {
        check_grid(grid, params)?;
        let start = Instant::now();
        let faces = self.accelerator.dispatch(grid.as_slice(), params);
        self.stats.record(start.elapsed());
        if let Some(average) = self.stats.average() {
            log::debug!(
                "{} dispatch: {} triangles, average {:?} over {} passes",
                self.accelerator.name(),
                faces.len(),
                average,
                self.stats.passes(),
            );
        }
        Ok(UnindexedMesh { faces })
    }
}

impl std::fmt::Debug for ParallelCubes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelCubes")
            .field("accelerator", &self.accelerator.name())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Marcher for ParallelCubes {
    fn name(&self) -> &'static str {
        "parallel-cubes"
    }

    fn march(&mut self, grid: &ValueGrid, params: &MarchParams) -> Result<Mesh> {
        let soup = self.march_unindexed(grid, params)?;
        Ok(timed!(soup.index(), "triangle dedup"))
    }
}

#[cfg(test)]
fn sorted(faces: impl Iterator<Item = Triangle>) -> Vec<[[f32; 3]; 3]> {
    let mut faces: Vec<_> = faces.map(|tri| tri.map(|v| v.to_array())).collect();
    faces.sort_by(|a, b| a.partial_cmp(b).unwrap());
    faces
}

#[test]
fn serial_accelerator_matches_sequential() {
    let mut grid = ValueGrid::new(6).unwrap();
    grid.initialize(crate::FillPolicy::Random { seed: 3 }).unwrap();
    for interpolation in [crate::Interpolation::HalfPoint, crate::Interpolation::Linear] {
        let params = crate::MeshingConfig { bound_size: 6, interpolation, ..Default::default() }
            .validate()
            .unwrap();
        let expected = super::MarchingCubes::new().march_full(&grid, &params);

        let mut parallel = ParallelCubes::new(Box::new(SerialAccelerator));
        let mesh = parallel.march(&grid, &params).unwrap();
        assert_eq!(sorted(mesh.triangles()), sorted(expected.triangles()));
        assert_eq!(mesh.vertex_count(), expected.vertex_count());
    }
}

#[test]
fn stats_track_passes() {
    let grid = ValueGrid::new(3).unwrap();
    let params = crate::MeshingConfig { bound_size: 3, ..Default::default() }.validate().unwrap();
    let mut parallel = ParallelCubes::new(Box::new(SerialAccelerator));
    assert_eq!(parallel.stats().average(), None);
    parallel.march(&grid, &params).unwrap();
    parallel.march(&grid, &params).unwrap();
    assert_eq!(parallel.stats().passes(), 2);
}

#[test]
fn kernel_emits_at_most_five() {
    let values = [1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
    let params = crate::MeshingConfig { bound_size: 2, ..Default::default() }.validate().unwrap();
    let mut out = CubeTriangles::new();
    cube_kernel(&values, &params, 0, &mut out);
    assert!(!out.is_empty());
    assert!(out.len() <= MAX_CUBE_TRIANGLES);
}

#[cfg(feature = "multi-thread")]
#[test]
fn rayon_accelerator_matches_sequential() {
    let mut grid = ValueGrid::new(10).unwrap();
    grid.initialize(crate::FillPolicy::Random { seed: 11 }).unwrap();
    let params = crate::MeshingConfig { bound_size: 10, interpolation: crate::Interpolation::Smoothstep, ..Default::default() }
        .validate()
        .unwrap();
    let expected = super::MarchingCubes::new().march_full(&grid, &params);

    let accelerator = RayonAccelerator::with_threads(4).unwrap();
    assert_eq!(accelerator.threads(), 4);
    let mut parallel = ParallelCubes::new(Box::new(accelerator));
    let mesh = parallel.march(&grid, &params).unwrap();
    assert_eq!(sorted(mesh.triangles()), sorted(expected.triangles()));
    assert_eq!(mesh.vertex_count(), expected.vertex_count());
}
