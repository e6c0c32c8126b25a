use iso_sculpt::{
    glam::{ IVec3, Vec3 },
    marcher::{ Marcher, MarchingCubes, Membership, ParallelCubes, SerialAccelerator, StrategyKind },
    Boundary, ConfigError, EditCommand, EditSession, Error, FillPolicy, Interpolation, Mesh, MeshingConfig, ValueGrid,
};

fn config(bound_size: i32) -> MeshingConfig {
    MeshingConfig { bound_size, ..Default::default() }
}

fn sorted_triangles(mesh: &Mesh) -> Vec<[[f32; 3]; 3]> {
    let mut triangles: Vec<_> = mesh.triangles().map(|tri| tri.map(|v| v.to_array())).collect();
    triangles.sort_by(|a, b| a.partial_cmp(b).unwrap());
    triangles
}

/// Samples cycling through values that stay exact under +-0.5.
fn quarter_field(bound_size: usize) -> Vec<f32> {
    (0..bound_size.pow(3)).map(|i| [0.0, 0.25, 0.75, 1.0][i * 7 % 4]).collect()
}

#[test]
fn empty_grid_has_no_surface() {
    for boundary in [Boundary::Interior, Boundary::Padded] {
        let session = EditSession::new(
            MeshingConfig { boundary, ..config(4) },
            FillPolicy::Constant(0.0),
            StrategyKind::Cubes,
        ).unwrap();
        assert_eq!(session.mesh().vertex_count(), 0);
        assert_eq!(session.mesh().triangle_count(), 0);
    }
}

#[test]
fn solid_grid_has_no_interior_surface() {
    let session = EditSession::new(config(4), FillPolicy::Constant(1.0), StrategyKind::Cubes).unwrap();
    assert!(session.mesh().is_empty());
}

#[test]
fn padded_solid_grid_is_closed_at_the_faces() {
    let config = MeshingConfig { boundary: Boundary::Padded, ..config(4) };
    let session = EditSession::new(config, FillPolicy::Constant(1.0), StrategyKind::Cubes).unwrap();
    let mesh = session.mesh();
    assert!(!mesh.is_empty());
    // Every vertex sits half a step outside the sampled block
    for v in &mesh.vertices {
        assert!(v.min_element() == -0.5 || v.max_element() == 3.5, "{v}");
    }
}

#[test]
fn single_corner_cube() {
    let mut values = vec![0.0; 8];
    values[0] = 1.0;
    let grid = ValueGrid::from_values(2, values).unwrap();
    let params = config(2).validate().unwrap();
    let mesh = MarchingCubes::new().march(&grid, &params).unwrap();

    assert_eq!(mesh.triangle_count(), 1);
    // Midpoints of edges 0, 3 and 8 in reversed table order
    assert_eq!(mesh.triangles().next(), Some([
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(0.0, 0.0, 0.5),
        Vec3::new(0.5, 0.0, 0.0),
    ]));
}

#[test]
fn sample_on_threshold_is_outside() {
    let mut values = vec![0.0; 8];
    values[0] = 0.5;
    let grid = ValueGrid::from_values(2, values).unwrap();
    let params = config(2).validate().unwrap();
    assert!(MarchingCubes::new().march(&grid, &params).unwrap().is_empty());
}

#[test]
fn add_then_remove_restores_everything() {
    for kind in [StrategyKind::Cubes, StrategyKind::Parallel] {
        let field = quarter_field(8);
        let mut session = EditSession::new(config(8), FillPolicy::Supplied(&field), kind).unwrap();
        let grid_before = session.grid().clone();
        let mesh_before = session.mesh().clone();

        let center = IVec3::new(3, 4, 4);
        session.apply_edit(EditCommand::add(center, 0.5)).unwrap();
        assert_ne!(session.grid(), &grid_before);
        session.apply_edit(EditCommand::remove(center, 0.5)).unwrap();

        assert_eq!(session.grid(), &grid_before);
        assert_eq!(sorted_triangles(session.mesh()), sorted_triangles(&mesh_before));
        assert_eq!(session.mesh().vertex_count(), mesh_before.vertex_count());
    }
}

#[test]
fn full_march_is_idempotent() {
    let mut grid = ValueGrid::new(12).unwrap();
    grid.initialize(FillPolicy::Random { seed: 42 }).unwrap();
    let params = MeshingConfig { interpolation: Interpolation::Linear, ..config(12) }.validate().unwrap();

    let mut marcher = MarchingCubes::new();
    let first = marcher.march(&grid, &params).unwrap();
    let second = marcher.march(&grid, &params).unwrap();
    assert_eq!(first.vertex_count(), second.vertex_count());
    assert_eq!(first.triangle_count(), second.triangle_count());
    assert_eq!(sorted_triangles(&first), sorted_triangles(&second));
}

#[test]
fn parallel_matches_sequential() {
    let mut grid = ValueGrid::new(9).unwrap();
    grid.initialize(FillPolicy::Random { seed: 5 }).unwrap();

    for boundary in [Boundary::Interior, Boundary::Padded] {
        let params = MeshingConfig { boundary, interpolation: Interpolation::Smoothstep, ..config(9) }
            .validate()
            .unwrap();
        let expected = MarchingCubes::new().march(&grid, &params).unwrap();

        let mut serial = ParallelCubes::new(Box::new(SerialAccelerator));
        assert_eq!(sorted_triangles(&serial.march(&grid, &params).unwrap()), sorted_triangles(&expected));

        let mut parallel = StrategyKind::Parallel.create().unwrap();
        let mesh = parallel.march(&grid, &params).unwrap();
        assert_eq!(sorted_triangles(&mesh), sorted_triangles(&expected));
        assert_eq!(mesh.vertex_count(), expected.vertex_count());
    }
}

#[test]
fn selective_session_stays_near_edits() {
    let kind = StrategyKind::SelectiveCubes { membership: Membership::Threshold };
    let mut session = EditSession::new(config(10), FillPolicy::Constant(0.0), kind).unwrap();
    assert!(session.mesh().is_empty());

    let mesh = session.apply_edit(EditCommand::add(IVec3::splat(5), 1.0)).unwrap().clone();
    assert!(!mesh.is_empty());
    // Nothing reaches past the cubes sharing a touched point
    for v in &mesh.vertices {
        assert!(v.min_element() >= 3.0 && v.max_element() <= 7.0, "{v}");
    }

    // Switching strategy keeps the grid; a full pass sees the same surface
    session.set_strategy(StrategyKind::Cubes).unwrap();
    assert_eq!(sorted_triangles(session.mesh()), sorted_triangles(&mesh));
}

#[test]
fn selective_session_keeps_earlier_edits() {
    let kind = StrategyKind::SelectiveCubes { membership: Membership::Threshold };
    let mut session = EditSession::new(config(16), FillPolicy::Constant(0.0), kind).unwrap();

    let first = session.apply_edit(EditCommand::add(IVec3::splat(3), 1.0)).unwrap().triangle_count();
    let mesh = session.apply_edit(EditCommand::add(IVec3::splat(12), 1.0)).unwrap().clone();
    assert_eq!(mesh.triangle_count(), first * 2);
    assert!(mesh.vertices.iter().any(|v| v.max_element() < 8.0));

    session.set_strategy(StrategyKind::Cubes).unwrap();
    assert_eq!(sorted_triangles(&mesh), sorted_triangles(session.mesh()));
}

#[test]
fn oversized_grid_is_rejected() {
    let result = EditSession::new(config(i32::MAX), FillPolicy::Constant(0.0), StrategyKind::Cubes);
    assert!(matches!(result, Err(Error::Config(ConfigError::BoundSizeTooLarge(_)))));
}

#[test]
fn sparse_octree_is_unimplemented() {
    let result = EditSession::new(config(4), FillPolicy::Constant(0.0), StrategyKind::SparseOctree);
    assert!(matches!(result, Err(Error::UnimplementedStrategy(_))));
}

#[test]
fn mesh_exports_obj() {
    let mut values = vec![0.0; 8];
    values[0] = 1.0;
    let grid = ValueGrid::from_values(2, values).unwrap();
    let mesh = MarchingCubes::new().march(&grid, &config(2).validate().unwrap()).unwrap();

    let mut out = Vec::new();
    mesh.write_obj(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 3);
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 1);
}
