use crate::core::compile::table::CompiledTables;
use crate::core::interactions::potential::Potential;
use crate::core::models::structure::{AtomicStructure, Cell};
use crate::core::neighbors::list::NeighborList;
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, PartialEq)]
struct AtomsSnapshot {
    symbols: Vec<String>,
    masses: Vec<f64>,
    tags: Vec<i32>,
    positions: Vec<Point3<f64>>,
    momenta: Vec<Vector3<f64>>,
    charges: Vec<f64>,
}

impl AtomsSnapshot {
    fn of(structure: &AtomicStructure) -> Self {
        Self {
            symbols: structure.symbols().to_vec(),
            masses: structure.masses().to_vec(),
            tags: structure.tags().to_vec(),
            positions: structure.positions().to_vec(),
            momenta: structure.momenta().to_vec(),
            charges: structure.charges().to_vec(),
        }
    }
}

/// Record of what the engine currently holds, dimension by dimension.
///
/// Updated only after the corresponding engine call has succeeded, so a
/// dimension that failed to push still reads as stale. Comparisons are by
/// value.
#[derive(Debug, Clone, Default)]
pub struct StateMirror {
    atoms: Option<AtomsSnapshot>,
    cell: Option<Cell>,
    definitions: Option<Vec<Potential>>,
    tables: Option<CompiledTables>,
    lookup_tables_ready: bool,
    neighbor_list: Option<NeighborList>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_system(&self) -> bool {
        self.atoms.is_some()
    }

    pub fn atom_count(&self) -> Option<usize> {
        self.atoms.as_ref().map(|atoms| atoms.symbols.len())
    }

    pub fn composition_matches(&self, structure: &AtomicStructure) -> bool {
        self.atoms.as_ref().is_some_and(|atoms| {
            atoms.symbols == structure.symbols()
                && atoms.masses == structure.masses()
                && atoms.tags == structure.tags()
        })
    }

    pub fn positions_match(&self, structure: &AtomicStructure) -> bool {
        self.atoms
            .as_ref()
            .is_some_and(|atoms| atoms.positions == structure.positions())
    }

    pub fn momenta_match(&self, structure: &AtomicStructure) -> bool {
        self.atoms
            .as_ref()
            .is_some_and(|atoms| atoms.momenta == structure.momenta())
    }

    pub fn coordinates_match(&self, structure: &AtomicStructure) -> bool {
        self.positions_match(structure) && self.momenta_match(structure)
    }

    pub fn charges_match(&self, structure: &AtomicStructure) -> bool {
        self.atoms
            .as_ref()
            .is_some_and(|atoms| atoms.charges == structure.charges())
    }

    pub fn has_cell(&self) -> bool {
        self.cell.is_some()
    }

    pub fn cell_matches(&self, cell: &Cell) -> bool {
        self.cell.as_ref() == Some(cell)
    }

    pub fn has_definitions(&self) -> bool {
        self.definitions.is_some()
    }

    pub fn definitions_match(&self, definitions: &[Potential]) -> bool {
        self.definitions.as_deref() == Some(definitions)
    }

    pub fn compiled_tables(&self) -> Option<&CompiledTables> {
        self.tables.as_ref()
    }

    pub fn lookup_tables_ready(&self) -> bool {
        self.lookup_tables_ready
    }

    pub fn neighbor_list(&self) -> Option<&NeighborList> {
        self.neighbor_list.as_ref()
    }

    pub fn neighbor_list_matches(&self, list: Option<&NeighborList>) -> bool {
        match (&self.neighbor_list, list) {
            (Some(held), Some(wanted)) => held.same_entries(wanted),
            _ => false,
        }
    }

    /// Whether every dimension except momenta matches the desired state.
    pub fn matches_ignoring_momenta(
        &self,
        structure: &AtomicStructure,
        definitions: &[Potential],
        neighbor_list: Option<&NeighborList>,
    ) -> bool {
        self.composition_matches(structure)
            && self.positions_match(structure)
            && self.charges_match(structure)
            && self.cell_matches(structure.cell())
            && self.definitions_match(definitions)
            && self.lookup_tables_ready
            && self.neighbor_list_matches(neighbor_list)
    }

    /// Whether the engine holds exactly the desired state.
    pub fn matches(
        &self,
        structure: &AtomicStructure,
        definitions: &[Potential],
        neighbor_list: Option<&NeighborList>,
    ) -> bool {
        self.matches_ignoring_momenta(structure, definitions, neighbor_list)
            && self.momenta_match(structure)
    }

    /// The engine holds nothing.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// A fresh atom set was pushed; everything derived from the previous one is gone.
    pub fn record_atoms(&mut self, structure: &AtomicStructure) {
        *self = Self {
            atoms: Some(AtomsSnapshot::of(structure)),
            ..Self::default()
        };
    }

    pub fn record_coordinates(&mut self, positions: &[Point3<f64>], momenta: &[Vector3<f64>]) {
        if let Some(atoms) = &mut self.atoms {
            atoms.positions = positions.to_vec();
            atoms.momenta = momenta.to_vec();
        }
    }

    pub fn record_charges(&mut self, charges: &[f64]) {
        if let Some(atoms) = &mut self.atoms {
            atoms.charges = charges.to_vec();
        }
    }

    /// The engine drops its neighbor lists whenever the cell changes.
    pub fn record_cell(&mut self, cell: &Cell) {
        self.cell = Some(cell.clone());
        self.neighbor_list = None;
    }

    /// New interaction tables were registered; lookup tables must be rebuilt.
    pub fn record_definitions(&mut self, definitions: &[Potential], tables: CompiledTables) {
        self.definitions = Some(definitions.to_vec());
        self.tables = Some(tables);
        self.lookup_tables_ready = false;
    }

    /// Interaction tables are about to be overwritten by several engine calls.
    pub fn forget_definitions(&mut self) {
        self.definitions = None;
        self.tables = None;
        self.lookup_tables_ready = false;
    }

    /// Neighbor lists are about to be overwritten atom by atom.
    pub fn forget_neighbor_list(&mut self) {
        self.neighbor_list = None;
    }

    pub fn record_lookup_tables_built(&mut self) {
        self.lookup_tables_ready = true;
    }

    pub fn record_neighbor_list(&mut self, list: &NeighborList) {
        self.neighbor_list = Some(list.clone());
    }
}
