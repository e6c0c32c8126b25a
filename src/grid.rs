use ahash::RandomState;
use glam::IVec3;

use crate::{
    tool::{ Tool, Sphere },
    ConfigError,
};

/// How to fill a grid's samples.
#[derive(Clone, Copy, Debug)]
pub enum FillPolicy<'a> {
    /// Every sample gets the same value.
    Constant(f32),
    /// Reproducible pseudo-random samples in `[0, 1)`.
    Random { seed: u64 },
    /// A field produced elsewhere (e.g. a noise generator), flattened as
    /// `x + y*N + z*N*N`. Copied verbatim.
    Supplied(&'a [f32]),
}

/// Number of samples in a grid of `bound_size` per axis, if a grid that
/// size can be allocated at all.
pub fn sample_count(bound_size: usize) -> Result<usize, ConfigError> {
    if bound_size == 0 {
        return Err(ConfigError::NonPositiveBoundSize(0));
    }
    bound_size.checked_pow(3)
        .filter(|&count| count <= isize::MAX as usize / std::mem::size_of::<f32>())
        .ok_or(ConfigError::BoundSizeTooLarge(bound_size))
}

/// Sample at `pos` of a flattened cubic field of `bound_size` per axis, or
/// 0 outside it.
#[inline]
pub fn flat_get(values: &[f32], bound_size: usize, pos: IVec3) -> f32 {
    let n = bound_size as i32;
    if pos.x < 0 || pos.x >= n || pos.y < 0 || pos.y >= n || pos.z < 0 || pos.z >= n {
        return 0.0;
    }
    values[pos.x as usize + pos.y as usize * bound_size + pos.z as usize * bound_size * bound_size]
}

/// Cubic grid of scalar samples, `bound_size` per axis.
///
/// Reads outside the grid return 0 and writes outside it are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueGrid {
    bound_size: usize,
    values: Vec<f32>,
}

impl ValueGrid {
    /// Zero-filled grid.
    pub fn new(bound_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            bound_size,
            values: vec![0.0; sample_count(bound_size)?],
        })
    }

    /// Takes ownership of a flattened field of `bound_size³` samples.
    pub fn from_values(bound_size: usize, values: Vec<f32>) -> Result<Self, ConfigError> {
        let expected = sample_count(bound_size)?;
        if values.len() != expected {
            return Err(ConfigError::GridLengthMismatch { expected, got: values.len() });
        }
        Ok(Self { bound_size, values })
    }

    #[inline(always)]
    pub fn bound_size(&self) -> usize {
        self.bound_size
    }

    /// Flattened samples, `x + y*N + z*N*N`.
    #[inline(always)]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    #[inline(always)]
    pub fn contains(&self, pos: IVec3) -> bool {
        let n = self.bound_size as i32;
        pos.x >= 0 && pos.x < n &&
            pos.y >= 0 && pos.y < n &&
            pos.z >= 0 && pos.z < n
    }

    #[inline(always)]
    fn index(&self, pos: IVec3) -> usize {
        let n = self.bound_size;
        pos.x as usize + pos.y as usize * n + pos.z as usize * n * n
    }

    /// Sample at `pos`, or 0 outside the grid.
    #[inline]
    pub fn get(&self, pos: IVec3) -> f32 {
        flat_get(&self.values, self.bound_size, pos)
    }

    /// Overwrites the sample at `pos`. Returns whether the write landed.
    pub fn set(&mut self, pos: IVec3, value: f32) -> bool {
        if !self.contains(pos) {
            log::trace!("dropped out of range write at {pos}");
            return false;
        }
        let index = self.index(pos);
        self.values[index] = value;
        true
    }

    /// Refills every sample. A supplied field of the wrong length is
    /// rejected and leaves the grid untouched.
    pub fn initialize(&mut self, policy: FillPolicy<'_>) -> Result<(), ConfigError> {
        match policy {
            FillPolicy::Constant(value) => self.values.fill(value),
            FillPolicy::Random { seed } => {
                let state = RandomState::with_seeds(seed, !seed, seed.rotate_left(32), 0x9e37_79b9_7f4a_7c15);
                self.values.iter_mut()
                    .enumerate()
                    .for_each(|(index, value)| {
                        // Top 24 bits give every representable step of [0, 1)
                        *value = (state.hash_one(index as u64) >> 40) as f32 / (1u64 << 24) as f32;
                    });
            },
            FillPolicy::Supplied(field) => {
                if field.len() != self.values.len() {
                    return Err(ConfigError::GridLengthMismatch {
                        expected: self.values.len(),
                        got: field.len(),
                    });
                }
                self.values.copy_from_slice(field);
            },
        }
        Ok(())
    }

    /// Reallocates to `bound_size` samples per axis, keeping the overlapping
    /// region. New samples are 0.
    pub fn resize(&mut self, bound_size: usize) -> Result<(), ConfigError> {
        let mut resized = Self::new(bound_size)?;
        let overlap = self.bound_size.min(bound_size) as i32;
        for z in 0..overlap {
            for y in 0..overlap {
                for x in 0..overlap {
                    let pos = IVec3::new(x, y, z);
                    resized.set(pos, self.get(pos));
                }
            }
        }
        *self = resized;
        Ok(())
    }

    /// Points a round brush of `radius` touches around `center`.
    pub fn brush_points(&self, center: IVec3, radius: f32) -> Vec<IVec3> {
        Sphere::new(radius).points(center, self.bound_size)
    }

    /// Adds `delta` to every sample within `radius` of `center` and returns
    /// the touched points.
    pub fn apply_brush(&mut self, center: IVec3, radius: f32, delta: f32) -> Vec<IVec3> {
        let points = self.brush_points(center, radius);
        for &point in &points {
            let index = self.index(point);
            self.values[index] += delta;
        }
        points
    }
}

#[test]
fn get_set_bounds() {
    let mut grid = ValueGrid::new(4).unwrap();
    assert!(grid.set(IVec3::new(1, 2, 3), 0.75));
    assert_eq!(grid.get(IVec3::new(1, 2, 3)), 0.75);
    assert_eq!(grid.as_slice()[1 + 2 * 4 + 3 * 16], 0.75);

    // Out of range reads are 0, writes are dropped
    assert_eq!(grid.get(IVec3::new(-1, 0, 0)), 0.0);
    assert_eq!(grid.get(IVec3::new(0, 4, 0)), 0.0);
    assert!(!grid.set(IVec3::new(4, 0, 0), 1.0));
    assert!(!grid.set(IVec3::new(0, 0, -1), 1.0));
    assert_eq!(grid.as_slice().iter().sum::<f32>(), 0.75);
}

#[test]
fn construction_checks() {
    assert_eq!(ValueGrid::new(0), Err(ConfigError::NonPositiveBoundSize(0)));
    assert_eq!(
        ValueGrid::from_values(2, vec![0.0; 7]),
        Err(ConfigError::GridLengthMismatch { expected: 8, got: 7 })
    );
    assert!(ValueGrid::from_values(2, vec![0.0; 8]).is_ok());

    // Sample counts that overflow are refused before allocating
    let huge = i32::MAX as usize;
    assert_eq!(ValueGrid::new(huge), Err(ConfigError::BoundSizeTooLarge(huge)));
    assert_eq!(ValueGrid::from_values(huge, Vec::new()), Err(ConfigError::BoundSizeTooLarge(huge)));
    assert_eq!(sample_count(usize::MAX), Err(ConfigError::BoundSizeTooLarge(usize::MAX)));
    assert_eq!(sample_count(4), Ok(64));
}

#[test]
fn fill_policies() {
    let mut grid = ValueGrid::new(3).unwrap();
    grid.initialize(FillPolicy::Constant(0.5)).unwrap();
    assert!(grid.as_slice().iter().all(|&v| v == 0.5));

    grid.initialize(FillPolicy::Random { seed: 7 }).unwrap();
    assert!(grid.as_slice().iter().all(|&v| (0.0..1.0).contains(&v)));
    let mut again = ValueGrid::new(3).unwrap();
    again.initialize(FillPolicy::Random { seed: 7 }).unwrap();
    assert_eq!(grid, again);

    let field: Vec<f32> = (0..27).map(|i| i as f32).collect();
    grid.initialize(FillPolicy::Supplied(&field)).unwrap();
    assert_eq!(grid.get(IVec3::new(2, 1, 0)), 5.0);

    // Rejected fields leave the grid as it was
    let short = [1.0; 5];
    assert!(grid.initialize(FillPolicy::Supplied(&short)).is_err());
    assert_eq!(grid.get(IVec3::new(2, 1, 0)), 5.0);
}

#[test]
fn resize_keeps_overlap() {
    let field: Vec<f32> = (0..8).map(|i| i as f32 + 1.0).collect();
    let mut grid = ValueGrid::from_values(2, field).unwrap();
    grid.resize(3).unwrap();
    assert_eq!(grid.bound_size(), 3);
    assert_eq!(grid.get(IVec3::new(1, 1, 1)), 8.0);
    assert_eq!(grid.get(IVec3::new(2, 2, 2)), 0.0);

    grid.resize(1).unwrap();
    assert_eq!(grid.as_slice(), &[1.0]);
    assert!(grid.resize(0).is_err());
    assert_eq!(grid.bound_size(), 1);
}

#[test]
fn brush_shape() {
    let mut grid = ValueGrid::new(8).unwrap();
    let center = IVec3::splat(4);
    let touched = grid.apply_brush(center, 2.0, 1.0);
    assert!(touched.contains(&center));

    for z in 0..8 {
        for y in 0..8 {
            for x in 0..8 {
                let pos = IVec3::new(x, y, z);
                let sqr = (pos - center).as_vec3().length_squared();
                if sqr >= 4.0 {
                    assert_eq!(grid.get(pos), 0.0, "{pos} touched");
                }
            }
        }
    }
    // Every touched point gets the delta exactly once
    assert!(touched.iter().all(|&p| grid.get(p) == 1.0));

    grid.apply_brush(center, 2.0, -1.0);
    assert!(grid.as_slice().iter().all(|&v| v == 0.0));
}
