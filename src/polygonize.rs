use arrayvec::ArrayVec;
use glam::{ IVec3, Vec3 };

use crate::{
    tables::{ CORNER_OFFSETS, EDGE_CORNERS, MAX_CUBE_TRIANGLES, edge_mask, triangle_edges },
    interpolate::{ Interpolation, edge_vertex },
    Triangle,
    ValueGrid,
};

/// Corner positions and samples of one unit cell, in the corner order of
/// [`CORNER_OFFSETS`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeWindow {
    pub corners: [Vec3; 8],
    pub values: [f32; 8],
}

impl CubeWindow {
    /// Samples the cube whose lowest corner is the grid point `origin`.
    /// Corner positions are grid coordinates scaled by `step`.
    pub fn sample(grid: &ValueGrid, origin: IVec3, step: f32) -> Self {
        Self::sample_with(origin, step, |pos| grid.get(pos))
    }

    /// Same as [`CubeWindow::sample`] over any sample source.
    #[inline]
    pub fn sample_with<F: Fn(IVec3) -> f32>(origin: IVec3, step: f32, value: F) -> Self {
        let points = CORNER_OFFSETS.map(|offset| origin + offset);
        Self {
            corners: points.map(|point| point.as_vec3() * step),
            values: points.map(value),
        }
    }

    /// Grid points of the 8 corners.
    pub fn corner_points(origin: IVec3) -> [IVec3; 8] {
        CORNER_OFFSETS.map(|offset| origin + offset)
    }
}

/// Configuration index of a cube: bit `i` is set iff corner `i` is strictly
/// above `threshold`. A corner exactly on the threshold counts as outside.
#[inline]
pub fn config_index(values: &[f32; 8], threshold: f32) -> u8 {
    values.iter()
        .enumerate()
        .fold(0u8, |index, (corner, &value)| {
            if value > threshold { index | (1 << corner) } else { index }
        })
}

/// Configuration index from a per-corner membership test.
#[inline]
pub fn config_index_from<F: Fn(usize) -> bool>(inside: F) -> u8 {
    (0..8).fold(0u8, |index, corner| {
        if inside(corner) { index | (1 << corner) } else { index }
    })
}

/// Receives the triangles of a polygonized cube, already in output winding.
pub trait TriangleSink {
    fn push_triangle(&mut self, triangle: Triangle);
}

impl TriangleSink for Vec<Triangle> {
    #[inline(always)]
    fn push_triangle(&mut self, triangle: Triangle) {
        self.push(triangle);
    }
}

impl TriangleSink for ArrayVec<Triangle, MAX_CUBE_TRIANGLES> {
    #[inline(always)]
    fn push_triangle(&mut self, triangle: Triangle) {
        self.push(triangle);
    }
}

/// Emits the triangles of one cube into `sink` and returns how many were
/// emitted (0 to 5).
///
/// Each table triple `(e0, e1, e2)` is emitted as `(v2, v1, v0)`, which
/// makes counter-clockwise faces point away from the samples above the
/// threshold.
pub fn polygonize<S: TriangleSink + ?Sized>(
    config: u8,
    window: &CubeWindow,
    threshold: f32,
    method: Interpolation,
    sink: &mut S,
) -> usize {
    let mask = edge_mask(config);
    if mask == 0 {
        return 0;
    }

    let mut edge_vertices = [Vec3::ZERO; 12];
    for (edge, &(a, b)) in EDGE_CORNERS.iter().enumerate() {
        if mask & (1 << edge) != 0 {
            edge_vertices[edge] = edge_vertex(
                window.corners[a],
                window.corners[b],
                window.values[a],
                window.values[b],
                threshold,
                method,
            );
        }
    }

    let triangles = triangle_edges(config);
    for &[e0, e1, e2] in &triangles {
        sink.push_triangle([edge_vertices[e2], edge_vertices[e1], edge_vertices[e0]]);
    }
    triangles.len()
}

/// Samples, classifies and polygonizes the cube at `origin` in one go.
pub fn march_cube<S: TriangleSink + ?Sized>(
    grid: &ValueGrid,
    origin: IVec3,
    step: f32,
    threshold: f32,
    method: Interpolation,
    sink: &mut S,
) -> usize {
    let window = CubeWindow::sample(grid, origin, step);
    let config = config_index(&window.values, threshold);
    polygonize(config, &window, threshold, method, sink)
}

#[cfg(test)]
fn window_with_config(config: u8) -> CubeWindow {
    CubeWindow::sample_with(IVec3::ZERO, 1.0, |pos| {
        let corner = CORNER_OFFSETS.iter().position(|&o| o == pos).unwrap();
        if config & (1 << corner) != 0 { 1.0 } else { 0.0 }
    })
}

#[test]
fn classification_is_strict() {
    let mut values = [0.0; 8];
    values[0] = 0.5;
    assert_eq!(config_index(&values, 0.5), 0);
    values[0] = 0.5001;
    assert_eq!(config_index(&values, 0.5), 1);
    values[7] = 2.0;
    assert_eq!(config_index(&values, 0.5), 0b1000_0001);
    assert_eq!(config_index(&[1.0; 8], 0.5), 255);
    assert_eq!(config_index_from(|corner| corner == 3), 0b0000_1000);
}

#[test]
fn uniform_cubes_emit_nothing() {
    for config in [0u8, 255] {
        let mut sink = Vec::new();
        let window = window_with_config(config);
        assert_eq!(polygonize(config, &window, 0.5, Interpolation::Linear, &mut sink), 0);
        assert!(sink.is_empty());
    }
}

#[test]
fn every_configuration_emits_whole_triangles() {
    for config in 1..=254u8 {
        let window = window_with_config(config);
        assert_eq!(config_index(&window.values, 0.5), config);

        let mut sink = Vec::new();
        let count = polygonize(config, &window, 0.5, Interpolation::HalfPoint, &mut sink);
        assert!((1..=MAX_CUBE_TRIANGLES).contains(&count));
        assert_eq!(sink.len(), count);

        // Every vertex is the midpoint of an active edge
        let mask = edge_mask(config);
        for vertex in sink.iter().flatten() {
            let on_active_edge = EDGE_CORNERS.iter().enumerate().any(|(edge, &(a, b))| {
                mask & (1 << edge) != 0 && (window.corners[a] + window.corners[b]) * 0.5 == *vertex
            });
            assert!(on_active_edge, "config {config} vertex {vertex}");
        }
    }
}

#[test]
fn single_corner_winding() {
    let window = window_with_config(1);
    let mut sink = Vec::new();
    assert_eq!(polygonize(1, &window, 0.5, Interpolation::HalfPoint, &mut sink), 1);
    // Table order is edges (0, 8, 3); emitted reversed
    assert_eq!(sink[0], [
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(0.5, 0.0, 0.0),
    ]);

    // Normal points away from the inside corner
    let [a, b, c] = sink[0];
    let normal = (b - a).cross(c - a);
    assert!(normal.dot(Vec3::ONE) > 0.0);
}

#[test]
fn sample_scales_by_step() {
    let grid = ValueGrid::new(4).unwrap();
    let window = CubeWindow::sample(&grid, IVec3::new(1, 2, 0), 0.5);
    assert_eq!(window.corners[0], Vec3::new(0.5, 1.0, 0.0));
    assert_eq!(window.corners[6], Vec3::new(1.0, 1.5, 0.5));
    assert_eq!(CubeWindow::corner_points(IVec3::ZERO)[6], IVec3::ONE);
}
