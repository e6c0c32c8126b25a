use glam::IVec3;

use crate::{
    marcher::{ Marcher, StrategyKind },
    tool::Action,
    FillPolicy, MarchParams, Mesh, MeshingConfig, Result, ValueGrid,
};

/// One sculpt edit, already snapped to the grid.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditCommand {
    pub position: IVec3,
    pub action: Action,
    pub strength: f32,
}

impl EditCommand {
    pub fn new(position: IVec3, action: Action, strength: f32) -> Self {
        Self { position, action, strength }
    }

    pub fn add(position: IVec3, strength: f32) -> Self {
        Self::new(position, Action::Add, strength)
    }

    pub fn remove(position: IVec3, strength: f32) -> Self {
        Self::new(position, Action::Remove, strength)
    }
}

/// Owns a value grid, the active meshing strategy and the latest mesh.
///
/// Edits are applied one at a time and each one remeshes before returning.
pub struct EditSession {
    config: MeshingConfig,
    params: MarchParams,
    grid: ValueGrid,
    kind: StrategyKind,
    strategy: Box<dyn Marcher>,
    mesh: Mesh,
}

impl EditSession {
    /// Validates `config`, fills a new grid and runs the first pass.
    pub fn new(config: MeshingConfig, fill: FillPolicy<'_>, kind: StrategyKind) -> Result<Self> {
        let params = config.validate()?;
        let mut grid = ValueGrid::new(params.bound_size)?;
        grid.initialize(fill)?;
        let strategy = kind.create()?;

        let mut session = Self {
            config,
            params,
            grid,
            kind,
            strategy,
            mesh: Mesh::default(),
        };
        session.remesh()?;
        Ok(session)
    }

    #[inline]
    pub fn grid(&self) -> &ValueGrid {
        &self.grid
    }

    /// Mesh produced by the latest pass.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn config(&self) -> &MeshingConfig {
        &self.config
    }

    #[inline]
    pub fn params(&self) -> &MarchParams {
        &self.params
    }

    #[inline]
    pub fn strategy(&self) -> StrategyKind {
        self.kind
    }

    /// Runs a pass of the active strategy and keeps its mesh.
    pub fn remesh(&mut self) -> Result<&Mesh> {
        self.mesh = self.strategy.march(&self.grid, &self.params)?;
        Ok(&self.mesh)
    }

    /// Brushes the grid around the edit position with the configured radius
    /// and remeshes.
    pub fn apply_edit(&mut self, edit: EditCommand) -> Result<&Mesh> {
        let delta = edit.action.delta(edit.strength);
        let touched = self.grid.apply_brush(edit.position, self.config.brush_radius, delta);
        log::trace!("{:?} at {} touched {} points", edit.action, edit.position, touched.len());
        self.strategy.mark_dirty(&touched, edit.action);
        self.remesh()
    }

    /// Same as [`EditSession::apply_edit`] with the configured brush
    /// strength.
    pub fn apply_action(&mut self, position: IVec3, action: Action) -> Result<&Mesh> {
        let strength = self.config.brush_strength;
        self.apply_edit(EditCommand::new(position, action, strength))
    }

    /// Swaps in new settings. Nothing changes unless they validate. A new
    /// bound size reallocates the grid, keeping the overlapping samples.
    pub fn update_config(&mut self, config: MeshingConfig) -> Result<&Mesh> {
        let params = config.validate()?;
        if params.bound_size != self.params.bound_size {
            log::info!("resizing grid from {} to {}", self.params.bound_size, params.bound_size);
            self.grid.resize(params.bound_size)?;
        }
        self.config = config;
        self.params = params;
        self.strategy.invalidate();
        self.remesh()
    }

    /// Switches strategy, keeping the grid. The old strategy stays active
    /// if the new one cannot be created.
    pub fn set_strategy(&mut self, kind: StrategyKind) -> Result<&Mesh> {
        let strategy = kind.create()?;
        log::info!("switching strategy from {} to {}", self.strategy.name(), strategy.name());
        self.strategy = strategy;
        self.kind = kind;
        self.remesh()
    }

    /// Refills the grid and starts over with a full pass.
    pub fn regenerate(&mut self, fill: FillPolicy<'_>) -> Result<&Mesh> {
        self.grid.initialize(fill)?;
        log::info!("regenerated {}³ grid", self.params.bound_size);
        self.strategy.invalidate();
        self.remesh()
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("config", &self.config)
            .field("strategy", &self.strategy.name())
            .field("vertices", &self.mesh.vertex_count())
            .field("triangles", &self.mesh.triangle_count())
            .finish()
    }
}

#[cfg(test)]
fn small_config() -> MeshingConfig {
    MeshingConfig { bound_size: 8, brush_radius: 2.0, ..Default::default() }
}

#[test]
fn edits_round_trip() {
    let mut session = EditSession::new(small_config(), FillPolicy::Constant(0.0), StrategyKind::Cubes).unwrap();
    assert!(session.mesh().is_empty());

    let center = IVec3::splat(4);
    session.apply_edit(EditCommand::add(center, 1.0)).unwrap();
    assert_eq!(session.grid().get(center), 1.0);
    assert!(!session.mesh().is_empty());

    session.apply_edit(EditCommand::remove(center, 1.0)).unwrap();
    assert!(session.grid().as_slice().iter().all(|&v| v == 0.0));
    assert!(session.mesh().is_empty());
}

#[test]
fn bad_config_changes_nothing() {
    let mut session = EditSession::new(small_config(), FillPolicy::Constant(0.25), StrategyKind::Cubes).unwrap();
    let before = session.grid().clone();
    let bad = MeshingConfig { step: -1.0, ..small_config() };
    assert!(session.update_config(bad).is_err());
    assert_eq!(session.grid(), &before);
    assert_eq!(session.config(), &small_config());

    assert!(EditSession::new(bad, FillPolicy::Constant(0.0), StrategyKind::Cubes).is_err());
}

#[test]
fn resize_keeps_samples() {
    let mut session = EditSession::new(small_config(), FillPolicy::Constant(0.0), StrategyKind::Cubes).unwrap();
    session.apply_edit(EditCommand::add(IVec3::splat(2), 1.0)).unwrap();
    let bigger = MeshingConfig { bound_size: 12, ..small_config() };
    session.update_config(bigger).unwrap();
    assert_eq!(session.grid().bound_size(), 12);
    assert_eq!(session.params().bound_size, 12);
    assert_eq!(session.grid().get(IVec3::splat(2)), 1.0);
    assert!(!session.mesh().is_empty());
}

#[test]
fn failed_switch_keeps_strategy() {
    let mut session = EditSession::new(small_config(), FillPolicy::Constant(0.0), StrategyKind::Cubes).unwrap();
    assert!(session.set_strategy(StrategyKind::SparseOctree).is_err());
    assert_eq!(session.strategy(), StrategyKind::Cubes);

    let selective = StrategyKind::SelectiveCubes { membership: Default::default() };
    session.set_strategy(selective).unwrap();
    assert_eq!(session.strategy(), selective);
}

#[test]
fn regenerate_refills() {
    let mut session = EditSession::new(small_config(), FillPolicy::Constant(0.0), StrategyKind::Cubes).unwrap();
    session.regenerate(FillPolicy::Constant(1.0)).unwrap();
    assert!(session.grid().as_slice().iter().all(|&v| v == 1.0));
    // Fully inside with interior cubes only
    assert!(session.mesh().is_empty());
}
