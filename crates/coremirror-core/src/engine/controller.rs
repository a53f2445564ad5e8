use super::adapter::{EngineAdapter, Stress};
use super::cache::{Quantity, QuantityCache, QuantityValue};
use super::config::{InvalidationPolicy, SyncConfig};
use super::error::{SyncError, SyncStep};
use super::handle::EngineHandle;
use super::mirror::StateMirror;
use crate::core::compile::cutoffs::individual_cutoffs;
use crate::core::compile::table::{CompiledTables, GroupIndex};
use crate::core::interactions::potential::Potential;
use crate::core::models::structure::AtomicStructure;
use crate::core::neighbors::list::{BruteForceNeighborBuilder, NeighborList, NeighborListBuilder};
use nalgebra::{Matrix3, Vector3};
use tracing::{debug, info, instrument, trace, warn};

/// What a synchronization round did to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub full_initialization: bool,
    pub steps: Vec<SyncStep>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Client-side owner of a desired system state.
///
/// The controller holds the structure and interaction definitions a caller
/// wants evaluated, pushes only the dimensions the engine does not already
/// hold, and caches derived quantities for as long as the engine provably
/// still holds the state they were computed from.
#[derive(Debug)]
pub struct SyncController {
    structure: Option<AtomicStructure>,
    definitions: Vec<Potential>,
    config: SyncConfig,
    cache: QuantityCache,
    neighbor_builder: Box<dyn NeighborListBuilder>,
    neighbor_list: Option<NeighborList>,
    /// Atom count of the system this controller last synchronized successfully.
    claimed_atoms: Option<usize>,
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

fn invalidate(cache: &mut QuantityCache, policy: InvalidationPolicy, momenta_only: bool) {
    if momenta_only && policy == InvalidationPolicy::IgnoreMomenta {
        return;
    }
    cache.invalidate_all();
}

fn differs_only_in_momenta(a: &AtomicStructure, b: &AtomicStructure) -> bool {
    a.same_composition(b) && a.same_positions(b) && a.charges() == b.charges() && a.cell() == b.cell()
}

fn require_current_atoms(
    mirror: &StateMirror,
    structure: &AtomicStructure,
    step: SyncStep,
) -> Result<(), SyncError> {
    if !mirror.has_system() {
        return Err(SyncError::Sequencing {
            step,
            requires: "atoms",
        });
    }
    if !mirror.composition_matches(structure) {
        return Err(SyncError::Sequencing {
            step,
            requires: "the current atom set",
        });
    }
    Ok(())
}

impl SyncController {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            structure: None,
            definitions: Vec::new(),
            config,
            cache: QuantityCache::new(),
            neighbor_builder: Box::new(BruteForceNeighborBuilder),
            neighbor_list: None,
            claimed_atoms: None,
        }
    }

    pub fn with_neighbor_builder(mut self, builder: impl NeighborListBuilder + 'static) -> Self {
        self.neighbor_builder = Box::new(builder);
        self.neighbor_list = None;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn structure(&self) -> Option<&AtomicStructure> {
        self.structure.as_ref()
    }

    pub fn definitions(&self) -> &[Potential] {
        &self.definitions
    }

    pub fn neighbor_list(&self) -> Option<&NeighborList> {
        self.neighbor_list.as_ref()
    }

    pub fn cache(&self) -> &QuantityCache {
        &self.cache
    }

    /// Replaces the configuration. New neighbor radii discard the current
    /// neighbor list, so the next round rebuilds and re-pushes it.
    pub fn set_config(&mut self, config: SyncConfig) {
        if config != self.config {
            if config.cutoff_scale != self.config.cutoff_scale || config.skin != self.config.skin {
                debug!("Neighbor radii changed; dropping the neighbor list.");
                self.neighbor_list = None;
            }
            self.cache.invalidate_all();
            self.config = config;
        }
    }

    pub fn set_structure(&mut self, structure: AtomicStructure) {
        match &self.structure {
            Some(current) if *current == structure => return,
            Some(current) => {
                let momenta_only = differs_only_in_momenta(current, &structure);
                invalidate(&mut self.cache, self.config.invalidation, momenta_only);
            }
            None => self.cache.invalidate_all(),
        }
        self.structure = Some(structure);
    }

    pub fn set_charges(&mut self, charges: Vec<f64>) -> Result<(), SyncError> {
        let mut structure = self.structure.clone().ok_or(SyncError::MissingStructure)?;
        structure.set_charges(charges)?;
        self.set_structure(structure);
        Ok(())
    }

    pub fn set_definitions(&mut self, definitions: Vec<Potential>) {
        if definitions != self.definitions {
            self.cache.invalidate_all();
            self.definitions = definitions;
        }
    }

    pub fn add_definition(&mut self, definition: Potential) {
        self.cache.invalidate_all();
        self.definitions.push(definition);
    }

    /// Forgets which system this controller believes it owns, so that the next
    /// round re-initializes the engine instead of reporting a conflict.
    pub fn release_claim(&mut self) {
        self.claimed_atoms = None;
    }

    pub fn force_full_initialization(&self) -> bool {
        self.config.force_full_initialization
    }

    pub fn set_force_full_initialization(&mut self, force: bool) {
        self.config.force_full_initialization = force;
    }

    /// Each atom's largest cutoff over the current definitions, times `scale`.
    pub fn individual_cutoffs(&self, scale: f64) -> Result<Vec<f64>, SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        Ok(individual_cutoffs(structure, &self.definitions, scale))
    }

    /// Whether the engine holds exactly this controller's desired state.
    pub fn is_synchronized<A: EngineAdapter>(&self, engine: &EngineHandle<A>) -> bool {
        self.structure.as_ref().is_some_and(|structure| {
            engine
                .mirror()
                .matches(structure, &self.definitions, self.neighbor_list.as_ref())
        })
    }

    /// Whether evaluating any of `quantities` would need engine work.
    pub fn calculation_required<A: EngineAdapter>(
        &self,
        engine: &EngineHandle<A>,
        quantities: &[Quantity],
    ) -> bool {
        !self.is_synchronized(engine) || quantities.iter().any(|&q| !self.cache.is_populated(q))
    }

    /// Brings the engine to the desired state, pushing only what differs.
    #[instrument(skip_all, name = "sync_round")]
    pub fn synchronize<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<SyncReport, SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        let atom_count = structure.len();
        let mirror = engine.mirror();
        let engine_atoms = engine.adapter().atom_count();

        let full_initialization = if self.config.force_full_initialization {
            debug!("Full initialization forced by configuration.");
            true
        } else if !mirror.has_system() {
            debug!("Engine holds no system.");
            true
        } else if engine_atoms != atom_count || mirror.atom_count() != Some(atom_count) {
            if self.claimed_atoms == Some(atom_count) && engine_atoms != atom_count {
                warn!(
                    engine_atoms,
                    atom_count, "Engine was re-initialized by another client."
                );
                return Err(SyncError::ResourceConflict {
                    expected_atoms: atom_count,
                    engine_atoms,
                });
            }
            debug!(engine_atoms, atom_count, "Atom count changed.");
            true
        } else if !mirror.composition_matches(structure) {
            debug!("Species, masses or tags changed.");
            true
        } else {
            false
        };

        let mut report = SyncReport {
            full_initialization,
            steps: Vec::new(),
        };
        if full_initialization {
            self.initialize(engine, &mut report)?;
        } else {
            self.update_incrementally(engine, &mut report)?;
        }
        self.claimed_atoms = Some(atom_count);

        if report.is_noop() {
            trace!("Engine already up to date.");
        } else {
            debug!(steps = ?report.steps, "Synchronization round finished.");
        }
        Ok(report)
    }

    fn initialize<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        info!(atoms = structure.len(), "Initializing engine from scratch.");
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        mirror.clear();
        adapter.push_atoms(structure)?;
        mirror.record_atoms(structure);
        report.steps.push(SyncStep::PushAtoms);

        self.update_cell(engine)?;
        report.steps.push(SyncStep::PushCell);
        self.update_interaction_tables(engine)?;
        report.steps.push(SyncStep::PushInteractionTables);
        self.update_lookup_tables(engine)?;
        report.steps.push(SyncStep::BuildLookupTables);
        self.sync_neighbor_lists(engine, report)
    }

    fn update_incrementally<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        let mirror = engine.mirror();
        let coordinates_stale = !mirror.coordinates_match(structure);
        let charges_stale = !mirror.charges_match(structure);
        let cell_stale = !mirror.cell_matches(structure.cell());
        let definitions_stale = !mirror.definitions_match(&self.definitions);

        if coordinates_stale {
            self.update_coordinates(engine)?;
            report.steps.push(SyncStep::PushCoordinates);
        }
        if charges_stale {
            self.update_charges(engine)?;
            report.steps.push(SyncStep::PushCharges);
        }
        if cell_stale {
            self.update_cell(engine)?;
            report.steps.push(SyncStep::PushCell);
        }
        if definitions_stale {
            self.update_interaction_tables(engine)?;
            report.steps.push(SyncStep::PushInteractionTables);
        }
        if !engine.mirror().lookup_tables_ready() {
            self.update_lookup_tables(engine)?;
            report.steps.push(SyncStep::BuildLookupTables);
        }
        self.sync_neighbor_lists(engine, report)
    }

    fn sync_neighbor_lists<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if self.refresh_neighbor_list()? {
            report.steps.push(SyncStep::BuildNeighborLists);
        }
        if !engine
            .mirror()
            .neighbor_list_matches(self.neighbor_list.as_ref())
        {
            self.push_neighbor_lists(engine)?;
            report.steps.push(SyncStep::PushNeighborLists);
        }
        Ok(())
    }

    pub fn update_coordinates<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        require_current_atoms(engine.mirror(), structure, SyncStep::PushCoordinates)?;
        let momenta_only = engine.mirror().positions_match(structure);
        invalidate(&mut self.cache, self.config.invalidation, momenta_only);

        let (adapter, mirror) = engine.parts_mut();
        adapter.push_coordinates(structure.positions(), structure.momenta())?;
        mirror.record_coordinates(structure.positions(), structure.momenta());
        debug!(momenta_only, "Pushed coordinates.");
        Ok(())
    }

    pub fn update_charges<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        require_current_atoms(engine.mirror(), structure, SyncStep::PushCharges)?;
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        adapter.push_charges(structure.charges())?;
        mirror.record_charges(structure.charges());
        debug!("Pushed charges.");
        Ok(())
    }

    pub fn update_cell<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        let cell = structure.cell();
        let inverse = match cell.inverse() {
            Some(inverse) => inverse,
            None if !cell.is_periodic() => Matrix3::zeros(),
            None => {
                return Err(SyncError::DegenerateCell {
                    periodic: cell.periodic(),
                });
            }
        };
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        adapter.push_cell(&cell.matrix(), &inverse, cell.periodic())?;
        mirror.record_cell(cell);
        debug!(periodic = ?cell.periodic(), "Pushed cell.");
        Ok(())
    }

    pub fn update_interaction_tables<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        if !engine.mirror().has_system() {
            return Err(SyncError::Sequencing {
                step: SyncStep::PushInteractionTables,
                requires: "atoms",
            });
        }
        let tables = CompiledTables::compile(&self.definitions);
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        mirror.forget_definitions();
        adapter.allocate_interaction_tables(tables.interactions.len())?;
        for entry in &tables.interactions {
            adapter.register_interaction_entry(entry)?;
        }
        adapter.allocate_bond_order_tables(tables.bond_orders.len())?;
        for entry in &tables.bond_orders {
            adapter.register_bond_order_entry(entry)?;
        }
        adapter.allocate_bond_order_storage(
            structure.len(),
            tables.interaction_count(),
            tables.group_count(),
        )?;
        debug!(
            entries = tables.interactions.len(),
            bond_order_entries = tables.bond_orders.len(),
            "Pushed interaction tables."
        );
        mirror.record_definitions(&self.definitions, tables);
        Ok(())
    }

    pub fn update_lookup_tables<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let mirror = engine.mirror();
        if !mirror.has_system() {
            return Err(SyncError::Sequencing {
                step: SyncStep::BuildLookupTables,
                requires: "atoms",
            });
        }
        if !mirror.has_definitions() {
            return Err(SyncError::Sequencing {
                step: SyncStep::BuildLookupTables,
                requires: "interaction tables",
            });
        }
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        adapter.build_interaction_lookup_tables()?;
        mirror.record_lookup_tables_built();
        debug!("Built interaction lookup tables.");
        Ok(())
    }

    /// Rebuilds the client-side neighbor list if it no longer describes the
    /// desired structure. Returns whether a rebuild happened.
    pub fn refresh_neighbor_list(&mut self) -> Result<bool, SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        let cutoffs = individual_cutoffs(structure, &self.definitions, self.config.cutoff_scale);
        let skin = self.config.skin;
        let stale = self
            .neighbor_list
            .as_ref()
            .is_none_or(|list| list.needs_rebuild(structure, &cutoffs, skin));
        if stale {
            self.neighbor_list = Some(self.neighbor_builder.build(structure, &cutoffs, skin));
        }
        Ok(stale)
    }

    /// Refreshes the neighbor list and pushes it to the engine.
    pub fn update_neighbor_lists<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        let mirror = engine.mirror();
        if !mirror.has_system() {
            return Err(SyncError::MissingDependency {
                step: SyncStep::PushNeighborLists,
                missing: "atoms",
            });
        }
        require_current_atoms(mirror, structure, SyncStep::PushNeighborLists)?;
        if !mirror.has_cell() {
            return Err(SyncError::MissingDependency {
                step: SyncStep::PushNeighborLists,
                missing: "cell",
            });
        }
        if !mirror.cell_matches(structure.cell()) {
            return Err(SyncError::Sequencing {
                step: SyncStep::PushNeighborLists,
                requires: "the current cell",
            });
        }
        self.refresh_neighbor_list()?;
        self.push_neighbor_lists(engine)
    }

    fn push_neighbor_lists<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        let list = self.neighbor_list.as_ref().ok_or_else(|| {
            SyncError::Internal("neighbor list missing after refresh".to_string())
        })?;
        self.cache.invalidate_all();

        let (adapter, mirror) = engine.parts_mut();
        mirror.forget_neighbor_list();
        for (atom, neighbors) in list.iter() {
            adapter.push_neighbor_list(atom, neighbors)?;
        }
        mirror.record_neighbor_list(list);
        debug!(pairs = list.pair_count(), "Pushed neighbor lists.");
        Ok(())
    }

    fn ensure_synchronized<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<(), SyncError> {
        if !self.is_synchronized(engine) {
            self.synchronize(engine)?;
        }
        Ok(())
    }

    /// Returns a derived quantity, from the cache when the engine provably
    /// still holds the state it was computed from, otherwise after a
    /// synchronization round and exactly one pull.
    #[instrument(skip_all, fields(quantity = ?quantity))]
    pub fn ensure_quantity<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        quantity: Quantity,
    ) -> Result<QuantityValue, SyncError> {
        self.ensure_synchronized(engine)?;
        if let Some(value) = self.cache.get(quantity) {
            trace!("Serving cached value.");
            return Ok(value.clone());
        }

        let (adapter, _) = engine.parts_mut();
        let value = match quantity {
            Quantity::Energy => QuantityValue::Energy(adapter.compute_energy()?),
            Quantity::Forces => QuantityValue::Forces(adapter.compute_forces()?),
            Quantity::Stress => QuantityValue::Stress(adapter.compute_stress()?),
            Quantity::Electronegativities => {
                QuantityValue::Electronegativities(adapter.compute_electronegativities()?)
            }
        };
        trace!("Pulled a fresh value.");
        self.cache.insert(value.clone());
        Ok(value)
    }

    pub fn energy<A: EngineAdapter>(&mut self, engine: &mut EngineHandle<A>) -> Result<f64, SyncError> {
        match self.ensure_quantity(engine, Quantity::Energy)? {
            QuantityValue::Energy(energy) => Ok(energy),
            other => Err(wrong_slot(&other)),
        }
    }

    pub fn forces<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<Vec<Vector3<f64>>, SyncError> {
        match self.ensure_quantity(engine, Quantity::Forces)? {
            QuantityValue::Forces(forces) => Ok(forces),
            other => Err(wrong_slot(&other)),
        }
    }

    pub fn stress<A: EngineAdapter>(&mut self, engine: &mut EngineHandle<A>) -> Result<Stress, SyncError> {
        match self.ensure_quantity(engine, Quantity::Stress)? {
            QuantityValue::Stress(stress) => Ok(stress),
            other => Err(wrong_slot(&other)),
        }
    }

    pub fn electronegativities<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<Vec<f64>, SyncError> {
        match self.ensure_quantity(engine, Quantity::Electronegativities)? {
            QuantityValue::Electronegativities(values) => Ok(values),
            other => Err(wrong_slot(&other)),
        }
    }

    /// Electronegativities with their mean subtracted.
    pub fn electronegativity_differences<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
    ) -> Result<Vec<f64>, SyncError> {
        let values = self.electronegativities(engine)?;
        if values.is_empty() {
            return Ok(values);
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(values.into_iter().map(|chi| chi - mean).collect())
    }

    fn group_of<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        definition_index: usize,
    ) -> Result<GroupIndex, SyncError> {
        self.ensure_synchronized(engine)?;
        engine
            .mirror()
            .compiled_tables()
            .and_then(|tables| tables.group_of(definition_index))
            .ok_or(SyncError::UnknownGroup {
                index: definition_index,
            })
    }

    /// Bond-order factors of every atom for the coordinator of a definition.
    pub fn bond_order_factors<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        definition_index: usize,
    ) -> Result<Vec<f64>, SyncError> {
        let group = self.group_of(engine, definition_index)?;
        let (adapter, _) = engine.parts_mut();
        Ok(adapter.compute_bond_order_factors(group)?)
    }

    pub fn bond_order_gradients<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        definition_index: usize,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, SyncError> {
        let group = self.group_of(engine, definition_index)?;
        self.check_atom(atom)?;
        let (adapter, _) = engine.parts_mut();
        Ok(adapter.compute_bond_order_gradients(group, atom)?)
    }

    pub fn bond_order_gradients_of_factor<A: EngineAdapter>(
        &mut self,
        engine: &mut EngineHandle<A>,
        definition_index: usize,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, SyncError> {
        let group = self.group_of(engine, definition_index)?;
        self.check_atom(atom)?;
        let (adapter, _) = engine.parts_mut();
        Ok(adapter.compute_bond_order_gradients_of_factor(group, atom)?)
    }

    fn check_atom(&self, atom: usize) -> Result<(), SyncError> {
        let structure = self.structure.as_ref().ok_or(SyncError::MissingStructure)?;
        Ok(structure.check_index(atom)?)
    }
}

fn wrong_slot(value: &QuantityValue) -> SyncError {
    SyncError::Internal(format!(
        "cache returned a value for {:?}",
        value.quantity()
    ))
}
