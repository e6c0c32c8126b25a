use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{ Deserialize, Serialize };

/// Values closer than this are treated as equal when placing edge vertices.
pub const INTERPOLATION_EPSILON: f32 = 1e-4;

/// How a vertex is placed along a crossed cube edge.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Edge midpoint, regardless of the sampled values.
    #[default]
    HalfPoint,
    /// Linear crossing point of the threshold.
    Linear,
    /// Linear crossing parameter eased with `t²(3 - 2t)`.
    Smoothstep,
}

/// Position of the surface vertex on the edge `a -> b`.
///
/// `value_a` and `value_b` are the field samples at either end. For
/// `Linear` and `Smoothstep`, an endpoint whose value sits on the threshold
/// is returned as is, and an edge with (nearly) equal values collapses to `a`.
pub fn edge_vertex(a: Vec3, b: Vec3, value_a: f32, value_b: f32, threshold: f32, method: Interpolation) -> Vec3 {
    match method {
        Interpolation::HalfPoint => half_point(a, b),
        Interpolation::Linear => crossing_parameter(value_a, value_b, threshold)
            .map_or_else(|end| end.pick(a, b), |t| a.lerp(b, t)),
        Interpolation::Smoothstep => crossing_parameter(value_a, value_b, threshold)
            .map_or_else(|end| end.pick(a, b), |t| a.lerp(b, t * t * (3.0 - 2.0 * t))),
    }
}

#[inline(always)]
fn half_point(a: Vec3, b: Vec3) -> Vec3 {
    a + (b - a) * 0.5
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endpoint {
    A,
    B,
}

impl Endpoint {
    #[inline(always)]
    fn pick(self, a: Vec3, b: Vec3) -> Vec3 {
        match self {
            Endpoint::A => a,
            Endpoint::B => b,
        }
    }
}

/// Crossing parameter `t` in `a + (b - a) * t`, or the endpoint to snap to.
fn crossing_parameter(value_a: f32, value_b: f32, threshold: f32) -> Result<f32, Endpoint> {
    if (threshold - value_a).abs() < INTERPOLATION_EPSILON {
        return Err(Endpoint::A);
    }
    if (threshold - value_b).abs() < INTERPOLATION_EPSILON {
        return Err(Endpoint::B);
    }
    if (value_a - value_b).abs() < INTERPOLATION_EPSILON {
        return Err(Endpoint::A);
    }
    Ok((threshold - value_a) / (value_b - value_a))
}

#[test]
fn half_point_ignores_values() {
    let a = Vec3::ZERO;
    let b = Vec3::new(2.0, 0.0, 0.0);
    assert_eq!(edge_vertex(a, b, 0.0, 1.0, 0.9, Interpolation::HalfPoint), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(edge_vertex(a, b, 0.5, 0.5, 0.5, Interpolation::HalfPoint), Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn linear_crossing() {
    let a = Vec3::ZERO;
    let b = Vec3::new(0.0, 4.0, 0.0);
    let v = edge_vertex(a, b, 0.0, 1.0, 0.25, Interpolation::Linear);
    assert!((v - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);

    // Orientation of the edge does not matter
    let v = edge_vertex(b, a, 1.0, 0.0, 0.25, Interpolation::Linear);
    assert!((v - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
}

#[test]
fn smoothstep_crossing() {
    let a = Vec3::ZERO;
    let b = Vec3::new(0.0, 0.0, 1.0);
    // t = 0.25 eases to 0.25² * (3 - 0.5) = 0.15625
    let v = edge_vertex(a, b, 0.0, 1.0, 0.25, Interpolation::Smoothstep);
    assert!((v.z - 0.15625).abs() < 1e-6);
    // The midpoint is a fixed point of the easing
    let v = edge_vertex(a, b, 0.0, 1.0, 0.5, Interpolation::Smoothstep);
    assert!((v.z - 0.5).abs() < 1e-6);
}

#[test]
fn endpoint_on_threshold_is_returned_exactly() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(2.0, 2.0, 3.0);
    for method in [Interpolation::Linear, Interpolation::Smoothstep] {
        assert_eq!(edge_vertex(a, b, 0.5, 0.9, 0.5, method), a);
        assert_eq!(edge_vertex(a, b, 0.50005, 0.9, 0.5, method), a);
        assert_eq!(edge_vertex(a, b, 0.1, 0.5, 0.5, method), b);
        // Both endpoints on the threshold: the first check wins
        assert_eq!(edge_vertex(a, b, 0.5, 0.5, 0.5, method), a);
    }
}

#[test]
fn flat_edge_collapses_to_first_endpoint() {
    let a = Vec3::ZERO;
    let b = Vec3::ONE;
    for method in [Interpolation::Linear, Interpolation::Smoothstep] {
        assert_eq!(edge_vertex(a, b, 0.2, 0.20001, 0.5, method), a);
    }
}
