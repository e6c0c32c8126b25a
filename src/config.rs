use std::ops::Range;

use crate::{ ConfigError, Interpolation, grid::sample_count };

#[cfg(feature = "serde")]
use serde::{ Deserialize, Serialize };

/// Which cubes a meshing pass visits.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Boundary {
    /// Only cubes whose 8 corners all lie inside the grid.
    #[default]
    Interior,
    /// Also cubes hanging one sample over each face of the grid. The missing
    /// samples read as 0, so a solid volume gets closed at its faces.
    Padded,
}

/// Meshing and brush settings as exposed to an inspector or config file.
///
/// Nothing here is trusted until [`MeshingConfig::validate`] accepts it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshingConfig {
    pub bound_size: i32,
    pub step: f32,
    pub iso_threshold: f32,
    pub interpolation: Interpolation,
    pub brush_radius: f32,
    pub brush_strength: f32,
    pub boundary: Boundary,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            bound_size: 16,
            step: 1.0,
            iso_threshold: 0.5,
            interpolation: Interpolation::HalfPoint,
            brush_radius: 2.0,
            brush_strength: 0.1,
            boundary: Boundary::Interior,
        }
    }
}

impl MeshingConfig {
    /// Checks every field and returns the parameters a meshing pass consumes.
    pub fn validate(&self) -> Result<MarchParams, ConfigError> {
        if self.bound_size <= 0 {
            return Err(ConfigError::NonPositiveBoundSize(self.bound_size as i64));
        }
        sample_count(self.bound_size as usize)?;
        // Written so NaN is rejected too
        if !(self.step > 0.0) {
            return Err(ConfigError::NonPositiveStep(self.step));
        }
        if !(self.brush_radius > 0.0) {
            return Err(ConfigError::NonPositiveBrushRadius(self.brush_radius));
        }

        Ok(MarchParams {
            bound_size: self.bound_size as usize,
            step: self.step,
            threshold: self.iso_threshold,
            interpolation: self.interpolation,
            boundary: self.boundary,
        })
    }
}

/// Validated parameters of one meshing pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchParams {
    pub bound_size: usize,
    pub step: f32,
    pub threshold: f32,
    pub interpolation: Interpolation,
    pub boundary: Boundary,
}

impl MarchParams {
    /// Cube origins visited along each axis.
    pub fn cube_range(&self) -> Range<i32> {
        let n = self.bound_size as i32;
        match self.boundary {
            Boundary::Interior => 0..(n - 1).max(0),
            Boundary::Padded => -1..n,
        }
    }

    /// Number of cubes along each axis.
    #[inline]
    pub fn cubes_per_axis(&self) -> usize {
        self.cube_range().len()
    }
}

#[test]
fn default_config_is_valid() {
    let params = MeshingConfig::default().validate().unwrap();
    assert_eq!(params.bound_size, 16);
    assert_eq!(params.threshold, 0.5);
    assert_eq!(params.cube_range(), 0..15);
}

#[test]
fn rejects_bad_config() {
    let bad_size = MeshingConfig { bound_size: 0, ..Default::default() };
    assert_eq!(bad_size.validate(), Err(ConfigError::NonPositiveBoundSize(0)));

    let bad_size = MeshingConfig { bound_size: -4, ..Default::default() };
    assert_eq!(bad_size.validate(), Err(ConfigError::NonPositiveBoundSize(-4)));

    let too_big = MeshingConfig { bound_size: i32::MAX, ..Default::default() };
    assert_eq!(too_big.validate(), Err(ConfigError::BoundSizeTooLarge(i32::MAX as usize)));

    let bad_step = MeshingConfig { step: 0.0, ..Default::default() };
    assert_eq!(bad_step.validate(), Err(ConfigError::NonPositiveStep(0.0)));

    let nan_step = MeshingConfig { step: f32::NAN, ..Default::default() };
    assert!(matches!(nan_step.validate(), Err(ConfigError::NonPositiveStep(_))));

    let bad_brush = MeshingConfig { brush_radius: -1.0, ..Default::default() };
    assert_eq!(bad_brush.validate(), Err(ConfigError::NonPositiveBrushRadius(-1.0)));
}

#[test]
fn cube_ranges() {
    let mut params = MeshingConfig { bound_size: 4, ..Default::default() }.validate().unwrap();
    assert_eq!(params.cube_range(), 0..3);
    assert_eq!(params.cubes_per_axis(), 3);

    params.boundary = Boundary::Padded;
    assert_eq!(params.cube_range(), -1..4);
    assert_eq!(params.cubes_per_axis(), 5);

    params.bound_size = 1;
    params.boundary = Boundary::Interior;
    assert_eq!(params.cubes_per_axis(), 0);
}
