//! An in-memory engine that records every call made to it.
//!
//! [`RecordingEngine`] enforces the same preconditions a real engine does
//! (atoms before lookup tables, neighbor lists before evaluation, cell changes
//! discarding neighbor lists) and answers evaluation requests through a
//! pluggable [`ResponseModel`]. It backs the test suite and the `trace`
//! command of the command-line tool.

use super::adapter::{AdapterError, EngineAdapter, Stress};
use crate::core::compile::table::{BondOrderEntry, GroupIndex, InteractionEntry};
use crate::core::models::structure::AtomicStructure;
use crate::core::neighbors::list::Neighbor;
use nalgebra::{Matrix3, Point3, Vector3};
use std::fmt;
use tracing::trace;

/// Everything the engine currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub symbols: Vec<String>,
    pub masses: Vec<f64>,
    pub tags: Vec<i32>,
    pub positions: Vec<Point3<f64>>,
    pub momenta: Vec<Vector3<f64>>,
    pub charges: Vec<f64>,
    pub cell: Option<(Matrix3<f64>, Matrix3<f64>, [bool; 3])>,
    pub interaction_capacity: usize,
    pub interactions: Vec<InteractionEntry>,
    pub bond_order_capacity: usize,
    pub bond_orders: Vec<BondOrderEntry>,
    pub bond_order_storage: Option<(usize, usize, usize)>,
    pub lookup_tables_built: bool,
    pub neighbor_lists: Vec<Option<Vec<Neighbor>>>,
}

impl EngineState {
    pub fn atom_count(&self) -> usize {
        self.symbols.len()
    }
}

/// How the recording engine answers evaluation requests.
///
/// Every method defaults to a zero response of the right shape.
pub trait ResponseModel: fmt::Debug {
    fn energy(&self, _state: &EngineState) -> f64 {
        0.0
    }
    fn forces(&self, state: &EngineState) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(); state.atom_count()]
    }
    fn stress(&self, _state: &EngineState) -> Stress {
        [0.0; 6]
    }
    fn electronegativities(&self, state: &EngineState) -> Vec<f64> {
        vec![0.0; state.atom_count()]
    }
    fn bond_order_factors(&self, state: &EngineState, _group: GroupIndex) -> Vec<f64> {
        vec![0.0; state.atom_count()]
    }
    fn bond_order_gradients(
        &self,
        state: &EngineState,
        _group: GroupIndex,
        _atom: usize,
    ) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(); state.atom_count()]
    }
    fn bond_order_gradients_of_factor(
        &self,
        state: &EngineState,
        _group: GroupIndex,
        _atom: usize,
    ) -> Vec<Vector3<f64>> {
        vec![Vector3::zeros(); state.atom_count()]
    }
}

/// Answers every request with zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentModel;

impl ResponseModel for SilentModel {}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AllocateInteractionTables(usize),
    RegisterInteractionEntry,
    AllocateBondOrderTables(usize),
    RegisterBondOrderEntry,
    AllocateBondOrderStorage {
        atoms: usize,
        interactions: usize,
        groups: usize,
    },
    PushAtoms(usize),
    PushCell,
    PushCharges,
    PushCoordinates,
    BuildLookupTables,
    PushNeighborList(usize),
    ComputeEnergy,
    ComputeForces,
    ComputeStress,
    ComputeElectronegativities,
    ComputeBondOrderFactors(GroupIndex),
    ComputeBondOrderGradients { group: GroupIndex, atom: usize },
    ComputeBondOrderGradientsOfFactor { group: GroupIndex, atom: usize },
    Release,
}

impl EngineCall {
    pub fn name(&self) -> &'static str {
        match self {
            EngineCall::AllocateInteractionTables(_) => "allocate_interaction_tables",
            EngineCall::RegisterInteractionEntry => "register_interaction_entry",
            EngineCall::AllocateBondOrderTables(_) => "allocate_bond_order_tables",
            EngineCall::RegisterBondOrderEntry => "register_bond_order_entry",
            EngineCall::AllocateBondOrderStorage { .. } => "allocate_bond_order_storage",
            EngineCall::PushAtoms(_) => "push_atoms",
            EngineCall::PushCell => "push_cell",
            EngineCall::PushCharges => "push_charges",
            EngineCall::PushCoordinates => "push_coordinates",
            EngineCall::BuildLookupTables => "build_interaction_lookup_tables",
            EngineCall::PushNeighborList(_) => "push_neighbor_list",
            EngineCall::ComputeEnergy => "compute_energy",
            EngineCall::ComputeForces => "compute_forces",
            EngineCall::ComputeStress => "compute_stress",
            EngineCall::ComputeElectronegativities => "compute_electronegativities",
            EngineCall::ComputeBondOrderFactors(_) => "compute_bond_order_factors",
            EngineCall::ComputeBondOrderGradients { .. } => "compute_bond_order_gradients",
            EngineCall::ComputeBondOrderGradientsOfFactor { .. } => {
                "compute_bond_order_gradients_of_factor"
            }
            EngineCall::Release => "release",
        }
    }

    /// Calls that read a derived quantity back from the engine.
    pub fn is_pull(&self) -> bool {
        matches!(
            self,
            EngineCall::ComputeEnergy
                | EngineCall::ComputeForces
                | EngineCall::ComputeStress
                | EngineCall::ComputeElectronegativities
                | EngineCall::ComputeBondOrderFactors(_)
                | EngineCall::ComputeBondOrderGradients { .. }
                | EngineCall::ComputeBondOrderGradientsOfFactor { .. }
        )
    }

    /// Calls that change what the engine holds.
    pub fn is_push(&self) -> bool {
        !self.is_pull() && *self != EngineCall::Release
    }
}

impl fmt::Display for EngineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCall::AllocateInteractionTables(n) | EngineCall::AllocateBondOrderTables(n) => {
                write!(f, "{}({n})", self.name())
            }
            EngineCall::AllocateBondOrderStorage {
                atoms,
                interactions,
                groups,
            } => write!(f, "{}({atoms}, {interactions}, {groups})", self.name()),
            EngineCall::PushAtoms(n) | EngineCall::PushNeighborList(n) => {
                write!(f, "{}({n})", self.name())
            }
            EngineCall::ComputeBondOrderFactors(group) => {
                write!(f, "{}({})", self.name(), group.0)
            }
            EngineCall::ComputeBondOrderGradients { group, atom }
            | EngineCall::ComputeBondOrderGradientsOfFactor { group, atom } => {
                write!(f, "{}({}, {atom})", self.name(), group.0)
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[derive(Debug)]
pub struct RecordingEngine {
    state: EngineState,
    calls: Vec<EngineCall>,
    model: Box<dyn ResponseModel>,
    fail_on: Option<&'static str>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::with_model(SilentModel)
    }

    pub fn with_model(model: impl ResponseModel + 'static) -> Self {
        Self {
            state: EngineState::default(),
            calls: Vec::new(),
            model: Box::new(model),
            fail_on: None,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|call| call.name() == name).count()
    }

    pub fn pull_count(&self) -> usize {
        self.calls.iter().filter(|call| call.is_pull()).count()
    }

    pub fn push_count(&self) -> usize {
        self.calls.iter().filter(|call| call.is_push()).count()
    }

    /// Makes the next call with the given name fail after being recorded.
    pub fn fail_next(&mut self, call_name: &'static str) {
        self.fail_on = Some(call_name);
    }

    fn enter(&mut self, call: EngineCall) -> Result<(), AdapterError> {
        trace!(call = %call, "Engine call.");
        let name = call.name();
        self.calls.push(call);
        if self.fail_on == Some(name) {
            self.fail_on = None;
            return Err(AdapterError::new(name, "injected failure"));
        }
        Ok(())
    }

    fn check_length(&self, call: &'static str, found: usize) -> Result<(), AdapterError> {
        if found == self.state.atom_count() {
            Ok(())
        } else {
            Err(AdapterError::new(
                call,
                format!(
                    "expected {} values, got {found}",
                    self.state.atom_count()
                ),
            ))
        }
    }

    fn ensure_ready(&self, call: &'static str) -> Result<(), AdapterError> {
        if self.state.symbols.is_empty() {
            return Err(AdapterError::new(call, "no atoms"));
        }
        if !self.state.lookup_tables_built {
            return Err(AdapterError::new(call, "interaction lookup tables are not built"));
        }
        if self.state.neighbor_lists.iter().any(Option::is_none) {
            return Err(AdapterError::new(call, "neighbor lists are missing"));
        }
        Ok(())
    }
}

impl EngineAdapter for RecordingEngine {
    fn allocate_interaction_tables(&mut self, count: usize) -> Result<(), AdapterError> {
        self.enter(EngineCall::AllocateInteractionTables(count))?;
        self.state.interaction_capacity = count;
        self.state.interactions.clear();
        self.state.lookup_tables_built = false;
        Ok(())
    }

    fn register_interaction_entry(&mut self, entry: &InteractionEntry) -> Result<(), AdapterError> {
        self.enter(EngineCall::RegisterInteractionEntry)?;
        if self.state.interactions.len() >= self.state.interaction_capacity {
            return Err(AdapterError::new(
                "register_interaction_entry",
                "interaction table is full",
            ));
        }
        self.state.interactions.push(entry.clone());
        Ok(())
    }

    fn allocate_bond_order_tables(&mut self, count: usize) -> Result<(), AdapterError> {
        self.enter(EngineCall::AllocateBondOrderTables(count))?;
        self.state.bond_order_capacity = count;
        self.state.bond_orders.clear();
        Ok(())
    }

    fn register_bond_order_entry(&mut self, entry: &BondOrderEntry) -> Result<(), AdapterError> {
        self.enter(EngineCall::RegisterBondOrderEntry)?;
        if self.state.bond_orders.len() >= self.state.bond_order_capacity {
            return Err(AdapterError::new(
                "register_bond_order_entry",
                "bond order table is full",
            ));
        }
        self.state.bond_orders.push(entry.clone());
        Ok(())
    }

    fn allocate_bond_order_storage(
        &mut self,
        atom_count: usize,
        interaction_count: usize,
        group_count: usize,
    ) -> Result<(), AdapterError> {
        self.enter(EngineCall::AllocateBondOrderStorage {
            atoms: atom_count,
            interactions: interaction_count,
            groups: group_count,
        })?;
        self.state.bond_order_storage = Some((atom_count, interaction_count, group_count));
        Ok(())
    }

    fn push_atoms(&mut self, structure: &AtomicStructure) -> Result<(), AdapterError> {
        self.enter(EngineCall::PushAtoms(structure.len()))?;
        self.state.symbols = structure.symbols().to_vec();
        self.state.masses = structure.masses().to_vec();
        self.state.tags = structure.tags().to_vec();
        self.state.positions = structure.positions().to_vec();
        self.state.momenta = structure.momenta().to_vec();
        self.state.charges = structure.charges().to_vec();
        self.state.neighbor_lists = vec![None; structure.len()];
        self.state.lookup_tables_built = false;
        Ok(())
    }

    fn push_cell(
        &mut self,
        vectors: &Matrix3<f64>,
        inverse: &Matrix3<f64>,
        periodic: [bool; 3],
    ) -> Result<(), AdapterError> {
        self.enter(EngineCall::PushCell)?;
        self.state.cell = Some((*vectors, *inverse, periodic));
        self.state.neighbor_lists = vec![None; self.state.atom_count()];
        Ok(())
    }

    fn push_charges(&mut self, charges: &[f64]) -> Result<(), AdapterError> {
        self.enter(EngineCall::PushCharges)?;
        self.check_length("push_charges", charges.len())?;
        self.state.charges = charges.to_vec();
        Ok(())
    }

    fn push_coordinates(
        &mut self,
        positions: &[Point3<f64>],
        momenta: &[Vector3<f64>],
    ) -> Result<(), AdapterError> {
        self.enter(EngineCall::PushCoordinates)?;
        self.check_length("push_coordinates", positions.len())?;
        self.check_length("push_coordinates", momenta.len())?;
        self.state.positions = positions.to_vec();
        self.state.momenta = momenta.to_vec();
        Ok(())
    }

    fn build_interaction_lookup_tables(&mut self) -> Result<(), AdapterError> {
        self.enter(EngineCall::BuildLookupTables)?;
        if self.state.symbols.is_empty() {
            return Err(AdapterError::new(
                "build_interaction_lookup_tables",
                "no atoms",
            ));
        }
        self.state.lookup_tables_built = true;
        Ok(())
    }

    fn push_neighbor_list(&mut self, atom: usize, neighbors: &[Neighbor]) -> Result<(), AdapterError> {
        self.enter(EngineCall::PushNeighborList(atom))?;
        let count = self.state.atom_count();
        match self.state.neighbor_lists.get_mut(atom) {
            Some(slot) => {
                *slot = Some(neighbors.to_vec());
                Ok(())
            }
            None => Err(AdapterError::new(
                "push_neighbor_list",
                format!("atom {atom} out of range for {count} atoms"),
            )),
        }
    }

    fn compute_energy(&mut self) -> Result<f64, AdapterError> {
        self.enter(EngineCall::ComputeEnergy)?;
        self.ensure_ready("compute_energy")?;
        Ok(self.model.energy(&self.state))
    }

    fn compute_forces(&mut self) -> Result<Vec<Vector3<f64>>, AdapterError> {
        self.enter(EngineCall::ComputeForces)?;
        self.ensure_ready("compute_forces")?;
        Ok(self.model.forces(&self.state))
    }

    fn compute_stress(&mut self) -> Result<Stress, AdapterError> {
        self.enter(EngineCall::ComputeStress)?;
        self.ensure_ready("compute_stress")?;
        Ok(self.model.stress(&self.state))
    }

    fn compute_electronegativities(&mut self) -> Result<Vec<f64>, AdapterError> {
        self.enter(EngineCall::ComputeElectronegativities)?;
        self.ensure_ready("compute_electronegativities")?;
        Ok(self.model.electronegativities(&self.state))
    }

    fn compute_bond_order_factors(&mut self, group: GroupIndex) -> Result<Vec<f64>, AdapterError> {
        self.enter(EngineCall::ComputeBondOrderFactors(group))?;
        self.ensure_ready("compute_bond_order_factors")?;
        Ok(self.model.bond_order_factors(&self.state, group))
    }

    fn compute_bond_order_gradients(
        &mut self,
        group: GroupIndex,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, AdapterError> {
        self.enter(EngineCall::ComputeBondOrderGradients { group, atom })?;
        self.ensure_ready("compute_bond_order_gradients")?;
        Ok(self.model.bond_order_gradients(&self.state, group, atom))
    }

    fn compute_bond_order_gradients_of_factor(
        &mut self,
        group: GroupIndex,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, AdapterError> {
        self.enter(EngineCall::ComputeBondOrderGradientsOfFactor { group, atom })?;
        self.ensure_ready("compute_bond_order_gradients_of_factor")?;
        Ok(self
            .model
            .bond_order_gradients_of_factor(&self.state, group, atom))
    }

    fn atom_count(&self) -> usize {
        self.state.atom_count()
    }

    fn release(&mut self) {
        self.calls.push(EngineCall::Release);
        self.state = EngineState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::{Atom, Cell};

    fn dimer() -> AtomicStructure {
        AtomicStructure::new(
            vec![
                Atom::new("H", Point3::origin()),
                Atom::new("H", Point3::new(0.74, 0.0, 0.0)),
            ],
            Cell::default(),
        )
    }

    #[test]
    fn evaluation_requires_lookup_tables_and_neighbor_lists() {
        let mut engine = RecordingEngine::new();
        assert!(engine.compute_energy().is_err());

        engine.push_atoms(&dimer()).unwrap();
        engine.build_interaction_lookup_tables().unwrap();
        let err = engine.compute_energy().unwrap_err();
        assert!(err.message.contains("neighbor lists"));

        engine.push_neighbor_list(0, &[]).unwrap();
        engine.push_neighbor_list(1, &[]).unwrap();
        assert_eq!(engine.compute_energy().unwrap(), 0.0);
        assert_eq!(engine.pull_count(), 3);
    }

    #[test]
    fn pushing_a_cell_discards_neighbor_lists() {
        let mut engine = RecordingEngine::new();
        engine.push_atoms(&dimer()).unwrap();
        engine.push_neighbor_list(0, &[]).unwrap();
        engine
            .push_cell(&Matrix3::identity(), &Matrix3::identity(), [true; 3])
            .unwrap();
        assert!(engine.state().neighbor_lists.iter().all(Option::is_none));
    }

    #[test]
    fn per_atom_pushes_check_the_atom_count() {
        let mut engine = RecordingEngine::new();
        engine.push_atoms(&dimer()).unwrap();
        assert!(engine.push_charges(&[0.0]).is_err());
        assert!(engine.push_neighbor_list(2, &[]).is_err());
    }

    #[test]
    fn injected_failures_fire_once() {
        let mut engine = RecordingEngine::new();
        engine.fail_next("push_atoms");
        assert!(engine.push_atoms(&dimer()).is_err());
        assert!(engine.push_atoms(&dimer()).is_ok());
        assert_eq!(engine.count("push_atoms"), 2);
    }

    #[test]
    fn release_forgets_everything() {
        let mut engine = RecordingEngine::new();
        engine.push_atoms(&dimer()).unwrap();
        engine.release();
        assert_eq!(engine.atom_count(), 0);
        assert_eq!(engine.calls().last(), Some(&EngineCall::Release));
        assert!(!EngineCall::Release.is_push());
    }
}
