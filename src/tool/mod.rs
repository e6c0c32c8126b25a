mod sphere;
pub use sphere::*;

mod action;
pub use action::*;

use glam::IVec3;

/// Axis signs to visit for an offset component. Zero has only one sign,
/// so no point is produced twice.
#[inline(always)]
fn signs(component: i32) -> &'static [i32] {
    if component == 0 { &[1] } else { &[1, -1] }
}

pub trait Tool {
    /// Offsets along each axis are scanned over `0..reach`, mirrored to
    /// both signs.
    fn reach(&self) -> i32;

    /// Whether an offset from the tool center is inside the tool.
    fn contains_offset(&self, offset: IVec3) -> bool;

    /// Every grid point the tool touches around `center` that lies inside a
    /// cubic grid of `bound_size` samples per axis.
    ///
    /// The scan is a per-axis bounding loop filtered by `contains_offset`,
    /// not a true shape rasterisation.
    fn points(&self, center: IVec3, bound_size: usize) -> Vec<IVec3> {
        let reach = self.reach();
        let bound = bound_size as i32;
        let mut points = Vec::new();

        for i in 0..reach {
            for j in 0..reach {
                for k in 0..reach {
                    for &sx in signs(i) {
                        for &sy in signs(j) {
                            for &sz in signs(k) {
                                let offset = IVec3::new(i * sx, j * sy, k * sz);
                                let point = center + offset;
                                let in_bounds = point.to_array().iter().all(|c| (0..bound).contains(c));
                                if in_bounds && self.contains_offset(offset) {
                                    points.push(point);
                                }
                            }
                        }
                    }
                }
            }
        }
        points
    }
}

#[test]
fn tool_points_are_unique_and_bounded() {
    use ahash::AHashSet;

    let tool = Sphere::new(2.0);
    let points = tool.points(IVec3::splat(4), 16);
    // radius 2 covers the full 3x3x3 neighbourhood
    assert_eq!(points.len(), 27);
    let unique: AHashSet<IVec3> = points.iter().copied().collect();
    assert_eq!(unique.len(), points.len());

    let tool = Sphere::new(3.0);
    for point in tool.points(IVec3::splat(4), 16) {
        let offset = point - IVec3::splat(4);
        assert!(offset.as_vec3().length_squared() < 9.0);
    }
}

#[test]
fn tool_points_clip_to_grid() {
    let tool = Sphere::new(2.0);
    let points = tool.points(IVec3::ZERO, 8);
    assert_eq!(points.len(), 8);
    assert!(points.iter().all(|p| p.min_element() >= 0));

    assert!(tool.points(IVec3::splat(-5), 8).is_empty());
}
