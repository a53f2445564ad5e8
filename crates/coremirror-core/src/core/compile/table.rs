use crate::core::interactions::potential::Potential;
use crate::core::interactions::targets::{TargetKind, TargetLabel, TargetSpec, TargetValue};
use itertools::Itertools;
use std::hash::Hash;
use tracing::debug;

/// Identifies the bond-order group of a coordinated potential: the potential's
/// position in the active definition list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupIndex(pub usize);

/// One concrete target ordering together with the tuple it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatch {
    pub kind: TargetKind,
    pub permuted: Vec<TargetLabel>,
    pub original: Vec<TargetLabel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEntry {
    pub kind: String,
    pub n_targets: usize,
    pub parameters: Vec<f64>,
    pub cutoff: f64,
    pub soft_cutoff: f64,
    pub targets: TargetMatch,
    pub group: Option<GroupIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondOrderEntry {
    pub kind: String,
    pub n_targets: usize,
    /// Parameters of all arity classes, concatenated.
    pub parameters: Vec<f64>,
    pub parameter_counts: Vec<usize>,
    pub cutoff: f64,
    pub soft_cutoff: f64,
    pub targets: TargetMatch,
    pub group: GroupIndex,
}

/// The flattened tables registered with the engine for one definition set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledTables {
    pub interactions: Vec<InteractionEntry>,
    pub bond_orders: Vec<BondOrderEntry>,
    groups: Vec<Option<GroupIndex>>,
}

impl CompiledTables {
    pub fn compile(definitions: &[Potential]) -> Self {
        let mut tables = Self::default();

        for (index, potential) in definitions.iter().enumerate() {
            let group = potential.coordinator().map(|_| GroupIndex(index));
            tables.groups.push(group);

            let matches = matches_of(potential.symbols())
                .into_iter()
                .chain(matches_of(potential.tags()))
                .chain(matches_of(potential.indices()));
            for targets in matches {
                tables.interactions.push(InteractionEntry {
                    kind: potential.kind_name().to_string(),
                    n_targets: potential.n_targets(),
                    parameters: potential.parameters().to_vec(),
                    cutoff: potential.cutoff(),
                    soft_cutoff: potential.soft_cutoff(),
                    targets,
                    group,
                });
            }

            if let (Some(coordinator), Some(group)) = (potential.coordinator(), group) {
                for set in coordinator.parameter_sets() {
                    for targets in matches_of(set.symbols()) {
                        tables.bond_orders.push(BondOrderEntry {
                            kind: set.kind_name().to_string(),
                            n_targets: set.n_targets(),
                            parameters: set.flat_parameters(),
                            parameter_counts: set.parameter_counts(),
                            cutoff: set.cutoff(),
                            soft_cutoff: set.soft_cutoff(),
                            targets,
                            group,
                        });
                    }
                }
            }
        }

        debug!(
            interactions = tables.interactions.len(),
            bond_orders = tables.bond_orders.len(),
            groups = tables.group_count(),
            "Compiled interaction tables."
        );
        tables
    }

    /// Number of definitions the tables were compiled from.
    pub fn interaction_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of definitions carrying a coordinator.
    pub fn group_count(&self) -> usize {
        self.groups.iter().flatten().count()
    }

    pub fn group_of(&self, definition_index: usize) -> Option<GroupIndex> {
        self.groups.get(definition_index).copied().flatten()
    }
}

/// All distinct orderings of `tuple`, in first-generated order.
pub fn distinct_permutations<T: Clone + Eq + Hash>(tuple: &[T]) -> Vec<Vec<T>> {
    tuple
        .iter()
        .cloned()
        .permutations(tuple.len())
        .unique()
        .collect()
}

fn matches_of<T: TargetValue>(spec: Option<&TargetSpec<T>>) -> Vec<TargetMatch> {
    let mut matches = Vec::new();
    for tuple in spec.into_iter().flat_map(TargetSpec::tuples) {
        let original: Vec<TargetLabel> = tuple.iter().map(T::to_label).collect();
        for permuted in distinct_permutations(tuple) {
            matches.push(TargetMatch {
                kind: T::KIND,
                permuted: permuted.iter().map(T::to_label).collect(),
                original: original.clone(),
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interactions::bond_order::{BondOrderParameters, Coordinator};
    use crate::core::interactions::registry::KindRegistry;
    use crate::core::interactions::targets::TargetInput;

    fn symbols(labels: &[&str]) -> Vec<TargetLabel> {
        labels
            .iter()
            .map(|s| TargetLabel::Symbol(s.to_string()))
            .collect()
    }

    #[test]
    fn distinct_permutations_collapse_repeated_values() {
        assert_eq!(distinct_permutations(&["H", "H"]).len(), 1);
        assert_eq!(distinct_permutations(&["H", "O"]).len(), 2);
        assert_eq!(distinct_permutations(&["Si", "O", "O"]).len(), 3);
        assert_eq!(distinct_permutations(&["Si", "O", "C"]).len(), 6);
    }

    #[test]
    fn every_distinct_ordering_becomes_an_entry_carrying_the_original() {
        let registry = KindRegistry::builtin();
        let potential = Potential::new(&registry, "LJ")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["H", "O"]))
            .unwrap()
            .with_parameters(vec![0.1, 2.5])
            .unwrap()
            .with_cutoff(4.0)
            .unwrap();

        let tables = CompiledTables::compile(&[potential]);
        assert_eq!(tables.interactions.len(), 2);
        assert_eq!(tables.interactions[0].targets.permuted, symbols(&["H", "O"]));
        assert_eq!(tables.interactions[1].targets.permuted, symbols(&["O", "H"]));
        for entry in &tables.interactions {
            assert_eq!(entry.targets.original, symbols(&["H", "O"]));
            assert_eq!(entry.group, None);
            assert_eq!(entry.cutoff, 4.0);
        }
        assert_eq!(tables.group_count(), 0);
        assert_eq!(tables.interaction_count(), 1);
    }

    #[test]
    fn symbol_tag_and_index_targets_are_emitted_in_that_order() {
        let registry = KindRegistry::builtin();
        let potential = Potential::new(&registry, "spring")
            .unwrap()
            .with_indices(TargetInput::Tuple(vec![3, 4]))
            .unwrap()
            .with_tags(TargetInput::Tuple(vec![1, 1]))
            .unwrap()
            .with_symbols(TargetInput::symbols(&["C", "C"]))
            .unwrap();

        let kinds: Vec<TargetKind> = CompiledTables::compile(&[potential])
            .interactions
            .iter()
            .map(|e| e.targets.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TargetKind::Symbols,
                TargetKind::Tags,
                TargetKind::Indices,
                TargetKind::Indices
            ]
        );
    }

    #[test]
    fn coordinated_potentials_get_their_position_as_group_index() {
        let registry = KindRegistry::builtin();
        let plain = Potential::new(&registry, "LJ")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["H", "H"]))
            .unwrap();
        let bond_params = BondOrderParameters::new(&registry, "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "O"]))
            .unwrap()
            .with_cutoff(3.0)
            .unwrap();
        let scaled = Potential::new(&registry, "LJ")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "Si"]))
            .unwrap()
            .with_coordinator(Coordinator::new(vec![bond_params]));

        let tables = CompiledTables::compile(&[plain, scaled]);
        assert_eq!(tables.group_of(0), None);
        assert_eq!(tables.group_of(1), Some(GroupIndex(1)));
        assert_eq!(tables.group_count(), 1);
        assert_eq!(tables.interactions[1].group, Some(GroupIndex(1)));

        assert_eq!(tables.bond_orders.len(), 2);
        assert!(tables.bond_orders.iter().all(|e| e.group == GroupIndex(1)));
        assert_eq!(tables.bond_orders[0].parameter_counts, vec![0, 0]);
        assert_eq!(tables.bond_orders[1].targets.permuted, symbols(&["O", "Si"]));
    }

    #[test]
    fn definitions_without_targets_register_nothing() {
        let registry = KindRegistry::builtin();
        let potential = Potential::new(&registry, "constant_potential").unwrap();
        let tables = CompiledTables::compile(&[potential]);
        assert!(tables.interactions.is_empty());
        assert_eq!(tables.interaction_count(), 1);
    }
}
