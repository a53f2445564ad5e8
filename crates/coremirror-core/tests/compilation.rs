use coremirror::core::compile::cutoffs::individual_cutoffs;
use coremirror::core::compile::table::{CompiledTables, GroupIndex};
use coremirror::core::interactions::bond_order::{BondOrderParameters, Coordinator};
use coremirror::core::interactions::pattern::{ExpansionMode, Slot, TargetPattern};
use coremirror::core::interactions::potential::Potential;
use coremirror::core::interactions::registry::KindRegistry;
use coremirror::core::interactions::targets::{TargetInput, TargetLabel};
use coremirror::core::models::structure::{Atom, AtomicStructure, Cell};
use nalgebra::Point3;
use std::io::Write;
use tempfile::NamedTempFile;

fn slot(values: &[&str]) -> Slot<String> {
    Slot::AnyOf(values.iter().map(|s| s.to_string()).collect())
}

#[test]
fn triplet_patterns_compile_into_every_distinct_ordering() {
    let registry = KindRegistry::builtin();
    let pattern = TargetPattern {
        slots: vec![slot(&["O", "H"]), Slot::One("Si".to_string()), slot(&["O"])],
        mode: ExpansionMode::Triplet,
    };
    let tuples = pattern.expand().unwrap();
    assert_eq!(tuples.len(), 3);

    let bending = Potential::new(&registry, "bond_bending")
        .unwrap()
        .with_symbols(TargetInput::Table(tuples))
        .unwrap()
        .with_parameters(vec![2.0, 1.9])
        .unwrap()
        .with_cutoff(2.5)
        .unwrap();
    let tables = CompiledTables::compile(&[bending]);

    // [Si,O,O] has 3 distinct orderings, [Si,H,O] and [Si,O,H] have 6 each.
    assert_eq!(tables.interactions.len(), 15);
    let first = &tables.interactions[0];
    assert_eq!(first.kind, "bond_bending");
    assert_eq!(first.n_targets, 3);
    assert_eq!(
        first.targets.original,
        vec![
            TargetLabel::Symbol("Si".to_string()),
            TargetLabel::Symbol("O".to_string()),
            TargetLabel::Symbol("O".to_string()),
        ]
    );
}

#[test]
fn coordinated_potentials_share_their_group_with_their_bond_order_entries() {
    let registry = KindRegistry::builtin();
    let tersoff = BondOrderParameters::new(&registry, "tersoff")
        .unwrap()
        .with_symbols(TargetInput::Table(vec![
            vec!["Si".to_string(), "Si".to_string(), "Si".to_string()],
        ]))
        .unwrap()
        .with_cutoff(3.0)
        .unwrap();
    let constant = Potential::new(&registry, "constant_potential")
        .unwrap()
        .with_symbols(TargetInput::symbols(&["O"]))
        .unwrap();
    let coordinated = Potential::new(&registry, "spring")
        .unwrap()
        .with_symbols(TargetInput::symbols(&["Si", "Si"]))
        .unwrap()
        .with_cutoff(2.8)
        .unwrap()
        .with_coordinator(Coordinator::new(vec![tersoff]));

    let tables = CompiledTables::compile(&[constant, coordinated]);
    assert_eq!(tables.group_of(0), None);
    assert_eq!(tables.group_of(1), Some(GroupIndex(1)));
    assert_eq!(tables.group_count(), 1);
    assert_eq!(tables.interaction_count(), 2);
    assert_eq!(tables.bond_orders.len(), 1);
    assert_eq!(tables.bond_orders[0].group, GroupIndex(1));
    assert_eq!(tables.bond_orders[0].parameter_counts, vec![2, 0, 5]);
    assert_eq!(tables.bond_orders[0].parameters.len(), 7);

    let structure = AtomicStructure::new(
        vec![
            Atom::new("Si", Point3::origin()),
            Atom::new("O", Point3::new(1.6, 0.0, 0.0)),
        ],
        Cell::default(),
    );
    let definitions = [
        Potential::new(&registry, "constant_potential")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["O"]))
            .unwrap()
            .with_cutoff(1.0)
            .unwrap(),
    ];
    assert_eq!(individual_cutoffs(&structure, &definitions, 1.0), vec![0.0, 1.0]);
}

#[test]
fn kinds_loaded_from_a_file_compile_like_builtin_ones() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[potentials.buckingham]
targets = 2
parameters = [{{ name = "A" }}, {{ name = "rho" }}, {{ name = "C" }}]
"#
    )
    .unwrap();

    let mut registry = KindRegistry::builtin();
    registry.extend_from_file(file.path()).unwrap();
    let buckingham = Potential::new(&registry, "buckingham")
        .unwrap()
        .with_symbols(TargetInput::symbols(&["Si", "O"]))
        .unwrap()
        .with_parameters(vec![1388.8, 0.362, 175.0])
        .unwrap();

    let tables = CompiledTables::compile(&[buckingham]);
    assert_eq!(tables.interactions.len(), 2);
    assert_eq!(tables.interactions[1].parameters, vec![1388.8, 0.362, 175.0]);
}
