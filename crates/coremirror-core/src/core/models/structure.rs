use nalgebra::{Matrix3, Point3, Vector3};
use phf::{Map, phf_map};
use thiserror::Error;

static STANDARD_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "He" => 4.0026,
    "Li" => 6.94,
    "Be" => 9.0122,
    "B" => 10.81,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "F" => 18.998,
    "Ne" => 20.180,
    "Na" => 22.990,
    "Mg" => 24.305,
    "Al" => 26.982,
    "Si" => 28.085,
    "P" => 30.974,
    "S" => 32.06,
    "Cl" => 35.45,
    "Ar" => 39.948,
    "K" => 39.098,
    "Ca" => 40.078,
    "Ti" => 47.867,
    "Fe" => 55.845,
    "Ni" => 58.693,
    "Cu" => 63.546,
    "Zn" => 65.38,
    "Ga" => 69.723,
    "Ge" => 72.630,
    "As" => 74.922,
    "Ag" => 107.87,
    "Pt" => 195.08,
    "Au" => 196.97,
};

/// Standard atomic mass (in atomic mass units) of a chemical element, if known.
pub fn standard_mass(symbol: &str) -> Option<f64> {
    STANDARD_MASSES.get(symbol).copied()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("Expected {expected} values for '{field}', but {found} were given")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Atom index {index} is out of range for a structure of {count} atoms")]
    IndexOutOfRange { index: usize, count: usize },
}

/// Simulation cell spanned by three lattice vectors, each with its own periodicity flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    vectors: [Vector3<f64>; 3],
    periodic: [bool; 3],
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            vectors: [Vector3::zeros(); 3],
            periodic: [false; 3],
        }
    }
}

impl Cell {
    pub fn new(vectors: [Vector3<f64>; 3], periodic: [bool; 3]) -> Self {
        Self { vectors, periodic }
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64, periodic: [bool; 3]) -> Self {
        Self::new(
            [
                Vector3::new(a, 0.0, 0.0),
                Vector3::new(0.0, b, 0.0),
                Vector3::new(0.0, 0.0, c),
            ],
            periodic,
        )
    }

    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.vectors
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic.iter().any(|&p| p)
    }

    /// The lattice vectors as the columns of a matrix, so that `matrix() * s`
    /// maps fractional coordinates `s` to Cartesian ones.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&self.vectors)
    }

    pub fn inverse(&self) -> Option<Matrix3<f64>> {
        self.matrix().try_inverse()
    }

    pub fn volume(&self) -> f64 {
        self.vectors[0].dot(&self.vectors[1].cross(&self.vectors[2])).abs()
    }

    /// Distance between the two lattice planes spanned by the vectors other than `axis`.
    ///
    /// Returns `None` for a degenerate cell.
    pub fn plane_spacing(&self, axis: usize) -> Option<f64> {
        let (j, k) = ((axis + 1) % 3, (axis + 2) % 3);
        let area = self.vectors[j].cross(&self.vectors[k]).norm();
        let volume = self.volume();
        if area <= f64::EPSILON || volume <= f64::EPSILON {
            None
        } else {
            Some(volume / area)
        }
    }

    /// Cartesian translation of the periodic image with integer lattice offset `offset`.
    pub fn translation(&self, offset: [i32; 3]) -> Vector3<f64> {
        self.vectors[0] * offset[0] as f64
            + self.vectors[1] * offset[1] as f64
            + self.vectors[2] * offset[2] as f64
    }
}

/// A single atom used to assemble an [`AtomicStructure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub symbol: String,
    pub mass: f64,
    pub position: Point3<f64>,
    pub momentum: Vector3<f64>,
    pub charge: f64,
    pub tag: i32,
}

impl Atom {
    /// Creates a neutral, resting atom with the standard mass of its element
    /// (zero if the element is unknown).
    pub fn new(symbol: &str, position: Point3<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            mass: standard_mass(symbol).unwrap_or(0.0),
            position,
            momentum: Vector3::zeros(),
            charge: 0.0,
            tag: 0,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_momentum(mut self, momentum: Vector3<f64>) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }
}

/// Client-side particle system: composition, kinematics, charges and the cell.
///
/// Stored as parallel per-atom arrays, which is also the layout the engine
/// receives them in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AtomicStructure {
    symbols: Vec<String>,
    masses: Vec<f64>,
    tags: Vec<i32>,
    positions: Vec<Point3<f64>>,
    momenta: Vec<Vector3<f64>>,
    charges: Vec<f64>,
    cell: Cell,
}

impl AtomicStructure {
    pub fn new(atoms: Vec<Atom>, cell: Cell) -> Self {
        let mut structure = Self {
            cell,
            ..Self::default()
        };
        for atom in atoms {
            structure.push(atom);
        }
        structure
    }

    pub fn push(&mut self, atom: Atom) {
        self.symbols.push(atom.symbol);
        self.masses.push(atom.mass);
        self.tags.push(atom.tag);
        self.positions.push(atom.position);
        self.momenta.push(atom.momentum);
        self.charges.push(atom.charge);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }
    pub fn tags(&self) -> &[i32] {
        &self.tags
    }
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }
    pub fn momenta(&self) -> &[Vector3<f64>] {
        &self.momenta
    }
    pub fn charges(&self) -> &[f64] {
        &self.charges
    }
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// Species, masses and tags agree atom by atom.
    pub fn same_composition(&self, other: &AtomicStructure) -> bool {
        self.symbols == other.symbols && self.masses == other.masses && self.tags == other.tags
    }

    pub fn same_coordinates(&self, other: &AtomicStructure) -> bool {
        self.positions == other.positions && self.momenta == other.momenta
    }

    pub fn same_positions(&self, other: &AtomicStructure) -> bool {
        self.positions == other.positions
    }

    pub fn set_positions(&mut self, positions: Vec<Point3<f64>>) -> Result<(), StructureError> {
        self.check_length("positions", positions.len())?;
        self.positions = positions;
        Ok(())
    }

    pub fn set_momenta(&mut self, momenta: Vec<Vector3<f64>>) -> Result<(), StructureError> {
        self.check_length("momenta", momenta.len())?;
        self.momenta = momenta;
        Ok(())
    }

    pub fn set_charges(&mut self, charges: Vec<f64>) -> Result<(), StructureError> {
        self.check_length("charges", charges.len())?;
        self.charges = charges;
        Ok(())
    }

    pub fn set_tags(&mut self, tags: Vec<i32>) -> Result<(), StructureError> {
        self.check_length("tags", tags.len())?;
        self.tags = tags;
        Ok(())
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = cell;
    }

    pub fn translate_atom(&mut self, index: usize, delta: Vector3<f64>) -> Result<(), StructureError> {
        self.check_index(index)?;
        self.positions[index] += delta;
        Ok(())
    }

    pub fn set_momentum(&mut self, index: usize, momentum: Vector3<f64>) -> Result<(), StructureError> {
        self.check_index(index)?;
        self.momenta[index] = momentum;
        Ok(())
    }

    pub fn set_charge(&mut self, index: usize, charge: f64) -> Result<(), StructureError> {
        self.check_index(index)?;
        self.charges[index] = charge;
        Ok(())
    }

    pub fn check_index(&self, index: usize) -> Result<(), StructureError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(StructureError::IndexOutOfRange {
                index,
                count: self.len(),
            })
        }
    }

    fn check_length(&self, field: &'static str, found: usize) -> Result<(), StructureError> {
        if found == self.len() {
            Ok(())
        } else {
            Err(StructureError::LengthMismatch {
                field,
                expected: self.len(),
                found,
            })
        }
    }
}
