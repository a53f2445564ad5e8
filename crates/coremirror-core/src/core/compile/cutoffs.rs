use crate::core::interactions::potential::Potential;
use crate::core::models::structure::AtomicStructure;

/// Largest cutoff of any definition affecting an atom with the given identity.
///
/// A potential affects the atom if any of its symbol, tag or index tuples
/// mentions it. Bond-order parameter sets of a coordinator affect the atom if
/// their symbol tuples mention its element, whether or not the potential itself
/// targets the atom.
pub fn max_cutoff(definitions: &[Potential], symbol: &str, tag: i32, index: usize) -> f64 {
    let mut max_cut: f64 = 0.0;
    for potential in definitions {
        if potential.targets().mentions_atom(symbol, tag, index) {
            max_cut = max_cut.max(potential.cutoff());
        }
        if let Some(bond_cut) = potential
            .coordinator()
            .and_then(|coordinator| coordinator.max_cutoff_for(symbol))
        {
            max_cut = max_cut.max(bond_cut);
        }
    }
    max_cut
}

/// Per-atom interaction radii: each atom's largest cutoff multiplied by `scale`.
///
/// Two atoms are neighbor candidates when their separation is below the sum of
/// their radii, so a scale of one half makes that sum equal the cutoff.
pub fn individual_cutoffs(
    structure: &AtomicStructure,
    definitions: &[Potential],
    scale: f64,
) -> Vec<f64> {
    structure
        .symbols()
        .iter()
        .zip(structure.tags())
        .enumerate()
        .map(|(index, (symbol, &tag))| max_cutoff(definitions, symbol, tag, index) * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interactions::bond_order::{BondOrderParameters, Coordinator};
    use crate::core::interactions::registry::KindRegistry;
    use crate::core::interactions::targets::TargetInput;
    use crate::core::models::structure::{Atom, Cell};
    use nalgebra::Point3;

    fn structure() -> AtomicStructure {
        AtomicStructure::new(
            vec![
                Atom::new("Si", Point3::origin()),
                Atom::new("O", Point3::new(1.6, 0.0, 0.0)).with_tag(2),
                Atom::new("H", Point3::new(3.0, 0.0, 0.0)),
            ],
            Cell::default(),
        )
    }

    #[test]
    fn each_atom_takes_the_largest_matching_cutoff() {
        let registry = KindRegistry::builtin();
        let si_o = Potential::new(&registry, "LJ")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "O"]))
            .unwrap()
            .with_cutoff(3.0)
            .unwrap();
        let by_tag = Potential::new(&registry, "constant_potential")
            .unwrap()
            .with_tags(TargetInput::Tuple(vec![2]))
            .unwrap()
            .with_cutoff(5.0)
            .unwrap();
        let by_index = Potential::new(&registry, "constant_potential")
            .unwrap()
            .with_indices(TargetInput::Tuple(vec![2]))
            .unwrap()
            .with_cutoff(1.0)
            .unwrap();

        let cutoffs = individual_cutoffs(&structure(), &[si_o, by_tag, by_index], 0.5);
        assert_eq!(cutoffs, vec![1.5, 2.5, 0.5]);
    }

    #[test]
    fn bond_order_cutoffs_count_by_symbol() {
        let registry = KindRegistry::builtin();
        let bond = BondOrderParameters::new(&registry, "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["H", "H"]))
            .unwrap()
            .with_cutoff(6.0)
            .unwrap();
        let scaled = Potential::new(&registry, "LJ")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "Si"]))
            .unwrap()
            .with_cutoff(2.0)
            .unwrap()
            .with_coordinator(Coordinator::new(vec![bond]));

        let cutoffs = individual_cutoffs(&structure(), &[scaled], 1.0);
        assert_eq!(cutoffs, vec![2.0, 0.0, 6.0]);
    }

    #[test]
    fn atoms_without_interactions_get_zero() {
        assert_eq!(individual_cutoffs(&structure(), &[], 0.5), vec![0.0; 3]);
    }
}
