use crate::core::compile::table::{BondOrderEntry, GroupIndex, InteractionEntry};
use crate::core::models::structure::AtomicStructure;
use crate::core::neighbors::list::Neighbor;
use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

/// Stress tensor in Voigt order: xx, yy, zz, yz, xz, xy.
pub type Stress = [f64; 6];

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Engine call '{call}' failed: {message}")]
pub struct AdapterError {
    pub call: &'static str,
    pub message: String,
}

impl AdapterError {
    pub fn new(call: &'static str, message: impl Into<String>) -> Self {
        Self {
            call,
            message: message.into(),
        }
    }
}

/// The stateful engine that evaluates energies and forces.
///
/// Every call is synchronous. The engine keeps whatever it is given until it is
/// overwritten, so implementors never need to track what the client has
/// already sent; that is the job of the state mirror.
pub trait EngineAdapter {
    fn allocate_interaction_tables(&mut self, count: usize) -> Result<(), AdapterError>;
    fn register_interaction_entry(&mut self, entry: &InteractionEntry) -> Result<(), AdapterError>;
    fn allocate_bond_order_tables(&mut self, count: usize) -> Result<(), AdapterError>;
    fn register_bond_order_entry(&mut self, entry: &BondOrderEntry) -> Result<(), AdapterError>;
    fn allocate_bond_order_storage(
        &mut self,
        atom_count: usize,
        interaction_count: usize,
        group_count: usize,
    ) -> Result<(), AdapterError>;

    /// Replaces the whole atom set: masses, charges, positions, momenta, tags
    /// and species. Discards neighbor lists and lookup tables.
    fn push_atoms(&mut self, structure: &AtomicStructure) -> Result<(), AdapterError>;
    fn push_cell(
        &mut self,
        vectors: &Matrix3<f64>,
        inverse: &Matrix3<f64>,
        periodic: [bool; 3],
    ) -> Result<(), AdapterError>;
    fn push_charges(&mut self, charges: &[f64]) -> Result<(), AdapterError>;
    fn push_coordinates(
        &mut self,
        positions: &[Point3<f64>],
        momenta: &[Vector3<f64>],
    ) -> Result<(), AdapterError>;
    fn build_interaction_lookup_tables(&mut self) -> Result<(), AdapterError>;
    fn push_neighbor_list(&mut self, atom: usize, neighbors: &[Neighbor]) -> Result<(), AdapterError>;

    fn compute_energy(&mut self) -> Result<f64, AdapterError>;
    fn compute_forces(&mut self) -> Result<Vec<Vector3<f64>>, AdapterError>;
    /// Engines without a stress implementation report a zero tensor.
    fn compute_stress(&mut self) -> Result<Stress, AdapterError> {
        Ok([0.0; 6])
    }
    /// Derivatives of the energy with respect to each atomic charge.
    fn compute_electronegativities(&mut self) -> Result<Vec<f64>, AdapterError>;
    fn compute_bond_order_factors(&mut self, group: GroupIndex) -> Result<Vec<f64>, AdapterError>;
    /// Gradients of the bond-order factor of `atom` with respect to every atom position.
    fn compute_bond_order_gradients(
        &mut self,
        group: GroupIndex,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, AdapterError>;
    /// Gradients of every atom's bond-order factor with respect to the position of `atom`.
    fn compute_bond_order_gradients_of_factor(
        &mut self,
        group: GroupIndex,
        atom: usize,
    ) -> Result<Vec<Vector3<f64>>, AdapterError>;

    fn atom_count(&self) -> usize;
    fn release(&mut self);
}
