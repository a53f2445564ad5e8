use crate::core::models::structure::{AtomicStructure, Cell};
use itertools::iproduct;
use nalgebra::Point3;
use std::fmt;
use tracing::{debug, warn};

/// A neighboring atom, possibly in a periodic image of the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Neighbor {
    pub index: usize,
    /// Lattice offset of the image the neighbor lives in.
    pub offset: [i32; 3],
}

/// Per-atom neighbor lists built with a skin, valid until some atom moves more
/// than half the skin or the cutoffs or cell change.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    cutoffs: Vec<f64>,
    skin: f64,
    reference_positions: Vec<Point3<f64>>,
    reference_cell: Cell,
    neighbors: Vec<Vec<Neighbor>>,
}

impl NeighborList {
    pub fn atom_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn neighbors_of(&self, atom: usize) -> &[Neighbor] {
        self.neighbors.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Neighbor])> {
        self.neighbors
            .iter()
            .enumerate()
            .map(|(atom, list)| (atom, list.as_slice()))
    }

    pub fn cutoffs(&self) -> &[f64] {
        &self.cutoffs
    }

    pub fn skin(&self) -> f64 {
        self.skin
    }

    pub fn pair_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }

    /// Whether the list has to be rebuilt before it can describe `structure`.
    pub fn needs_rebuild(&self, structure: &AtomicStructure, cutoffs: &[f64], skin: f64) -> bool {
        if structure.len() != self.atom_count()
            || cutoffs != self.cutoffs.as_slice()
            || skin != self.skin
            || structure.cell() != &self.reference_cell
        {
            return true;
        }
        let limit = 0.25 * skin * skin;
        structure
            .positions()
            .iter()
            .zip(&self.reference_positions)
            .any(|(now, then)| (now - then).norm_squared() > limit)
    }

    /// Same neighbors for every atom, regardless of when either list was built.
    pub fn same_entries(&self, other: &NeighborList) -> bool {
        self.neighbors == other.neighbors
    }
}

pub trait NeighborListBuilder: fmt::Debug {
    /// Builds lists for `structure` with one cutoff per atom.
    fn build(&self, structure: &AtomicStructure, cutoffs: &[f64], skin: f64) -> NeighborList;
}

/// Checks every pair of atoms against every periodic image in reach.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceNeighborBuilder;

impl BruteForceNeighborBuilder {
    fn image_ranges(cell: &Cell, reach: f64) -> [i32; 3] {
        let mut ranges = [0i32; 3];
        for axis in 0..3 {
            if !cell.periodic()[axis] {
                continue;
            }
            match cell.plane_spacing(axis) {
                Some(spacing) => ranges[axis] = (reach / spacing).ceil() as i32,
                None => warn!(
                    axis,
                    "Cell is degenerate along a periodic axis; no periodic images are searched."
                ),
            }
        }
        ranges
    }
}

impl NeighborListBuilder for BruteForceNeighborBuilder {
    fn build(&self, structure: &AtomicStructure, cutoffs: &[f64], skin: f64) -> NeighborList {
        let n_atoms = structure.len();
        let positions = structure.positions();
        let cell = structure.cell();

        let mut cutoffs = cutoffs.to_vec();
        if cutoffs.len() != n_atoms {
            warn!(
                atoms = n_atoms,
                cutoffs = cutoffs.len(),
                "Cutoff count does not match the atom count; missing cutoffs count as zero."
            );
            cutoffs.resize(n_atoms, 0.0);
        }

        let max_cutoff = cutoffs.iter().copied().fold(0.0, f64::max);
        let [ra, rb, rc] = Self::image_ranges(cell, 2.0 * max_cutoff + skin);

        let mut neighbors = vec![Vec::new(); n_atoms];
        for (i, j) in iproduct!(0..n_atoms, 0..n_atoms) {
            let radius = cutoffs[i] + cutoffs[j] + skin;
            for (a, b, c) in iproduct!(-ra..=ra, -rb..=rb, -rc..=rc) {
                let offset = [a, b, c];
                if i == j && offset == [0, 0, 0] {
                    continue;
                }
                let separation = (positions[j] + cell.translation(offset)) - positions[i];
                if separation.norm() < radius {
                    neighbors[i].push(Neighbor { index: j, offset });
                }
            }
        }

        let list = NeighborList {
            cutoffs,
            skin,
            reference_positions: positions.to_vec(),
            reference_cell: cell.clone(),
            neighbors,
        };
        debug!(
            atoms = n_atoms,
            pairs = list.pair_count(),
            "Built neighbor lists."
        );
        list
    }
}
