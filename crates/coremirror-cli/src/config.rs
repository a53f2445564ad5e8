use crate::cli::TraceArgs;
use crate::error::{CliError, Result};
use coremirror::core::interactions::bond_order::{BondOrderParameters, Coordinator};
use coremirror::core::interactions::pattern::TargetPattern;
use coremirror::core::interactions::potential::Potential;
use coremirror::core::interactions::registry::KindRegistry;
use coremirror::core::interactions::targets::TargetInput;
use coremirror::core::models::structure::{Atom, AtomicStructure, Cell, StructureError};
use coremirror::engine::config::{self as core_config, InvalidationPolicy};
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialInvalidation {
    Conservative,
    IgnoreMomenta,
}

impl From<PartialInvalidation> for InvalidationPolicy {
    fn from(p: PartialInvalidation) -> Self {
        match p {
            PartialInvalidation::Conservative => InvalidationPolicy::Conservative,
            PartialInvalidation::IgnoreMomenta => InvalidationPolicy::IgnoreMomenta,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSyncConfig {
    force_full_init: Option<bool>,
    cutoff_scale: Option<f64>,
    skin: Option<f64>,
    invalidation: Option<PartialInvalidation>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FileAtom {
    symbol: String,
    position: [f64; 3],
    momentum: Option<[f64; 3]>,
    #[serde(default)]
    charge: f64,
    #[serde(default)]
    tag: i32,
    mass: Option<f64>,
}

impl From<FileAtom> for Atom {
    fn from(f: FileAtom) -> Self {
        let mut atom = Atom::new(&f.symbol, Point3::from(f.position))
            .with_charge(f.charge)
            .with_tag(f.tag);
        if let Some(momentum) = f.momentum {
            atom = atom.with_momentum(Vector3::from(momentum));
        }
        if let Some(mass) = f.mass {
            atom = atom.with_mass(mass);
        }
        atom
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FileStructure {
    /// Cell vectors, one per row.
    cell: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pbc: [bool; 3],
    atoms: Vec<FileAtom>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileBondOrder {
    kind: String,
    symbols: Option<TargetInput<String>>,
    symbol_pattern: Option<TargetPattern<String>>,
    parameters: Option<Vec<Vec<f64>>>,
    cutoff: Option<f64>,
    cutoff_margin: Option<f64>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FilePotential {
    kind: String,
    symbols: Option<TargetInput<String>>,
    symbol_pattern: Option<TargetPattern<String>>,
    tags: Option<TargetInput<i32>>,
    indices: Option<TargetInput<usize>>,
    parameters: Option<Vec<f64>>,
    cutoff: Option<f64>,
    cutoff_margin: Option<f64>,
    #[serde(default)]
    bond_orders: Vec<FileBondOrder>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequestedQuantity {
    Energy,
    Forces,
    Stress,
    Electronegativities,
    BondOrderFactors,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AtomVector {
    pub atom: usize,
    pub value: [f64; 3],
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AtomScalar {
    pub atom: usize,
    pub value: f64,
}

fn default_client() -> String {
    "main".to_string()
}

/// One evaluation request, optionally preceded by edits to the requesting
/// client's structure.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Request {
    #[serde(default = "default_client")]
    pub client: String,
    pub quantity: RequestedQuantity,
    /// Definition whose bond-order group is queried.
    pub definition: Option<usize>,
    pub set_momentum: Option<AtomVector>,
    pub translate: Option<AtomVector>,
    pub set_charge: Option<AtomScalar>,
}

impl Request {
    pub fn apply(&self, structure: &mut AtomicStructure) -> std::result::Result<(), StructureError> {
        if let Some(edit) = &self.set_momentum {
            structure.set_momentum(edit.atom, Vector3::from(edit.value))?;
        }
        if let Some(edit) = &self.translate {
            structure.translate_atom(edit.atom, Vector3::from(edit.value))?;
        }
        if let Some(edit) = &self.set_charge {
            structure.set_charge(edit.atom, edit.value)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialScenario {
    registry: Option<PathBuf>,
    sync: Option<PartialSyncConfig>,
    structure: FileStructure,
    #[serde(default)]
    potentials: Vec<FilePotential>,
    #[serde(default)]
    requests: Vec<Request>,
}

/// Command-line values that take precedence over the `[sync]` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOverrides {
    pub force_full_init: bool,
    pub cutoff_scale: Option<f64>,
    pub skin: Option<f64>,
}

impl From<&TraceArgs> for SyncOverrides {
    fn from(args: &TraceArgs) -> Self {
        Self {
            force_full_init: args.force_full_init,
            cutoff_scale: args.cutoff_scale,
            skin: args.skin,
        }
    }
}

/// A fully resolved scenario.
#[derive(Debug)]
pub struct Scenario {
    pub registry: KindRegistry,
    pub sync: core_config::SyncConfig,
    pub structure: AtomicStructure,
    pub definitions: Vec<Potential>,
    pub requests: Vec<Request>,
}

impl PartialScenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading scenario from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the scenario. A relative registry path is taken relative to `base_dir`.
    pub fn merge_with_cli(self, overrides: SyncOverrides, base_dir: &Path) -> Result<Scenario> {
        let mut registry = KindRegistry::builtin();
        if let Some(path) = &self.registry {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            debug!("Merging extra kinds from {:?}", path);
            registry.extend_from_file(&path)?;
        }

        let sync = Self::merge_sync(self.sync.unwrap_or_default(), overrides)?;
        let structure = Self::build_structure(self.structure)?;
        let definitions = self
            .potentials
            .into_iter()
            .map(|p| Self::build_potential(&registry, p))
            .collect::<Result<Vec<_>>>()?;

        for (i, request) in self.requests.iter().enumerate() {
            if request.quantity == RequestedQuantity::BondOrderFactors
                && request.definition.is_none()
            {
                return Err(CliError::Config(format!(
                    "Request {} asks for bond-order factors but has no `definition`.",
                    i + 1
                )));
            }
        }

        Ok(Scenario {
            registry,
            sync,
            structure,
            definitions,
            requests: self.requests,
        })
    }

    fn merge_sync(
        partial: PartialSyncConfig,
        overrides: SyncOverrides,
    ) -> Result<core_config::SyncConfig> {
        let mut builder = core_config::SyncConfigBuilder::new()
            .force_full_initialization(
                overrides.force_full_init || partial.force_full_init.unwrap_or(false),
            );
        if let Some(scale) = overrides.cutoff_scale.or(partial.cutoff_scale) {
            builder = builder.cutoff_scale(scale);
        }
        if let Some(skin) = overrides.skin.or(partial.skin) {
            builder = builder.skin(skin);
        }
        if let Some(policy) = partial.invalidation {
            builder = builder.invalidation(policy.into());
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn build_structure(file: FileStructure) -> Result<AtomicStructure> {
        let cell = match file.cell {
            Some(rows) => Cell::new(rows.map(Vector3::from), file.pbc),
            None if file.pbc.iter().any(|&p| p) => {
                return Err(CliError::Config(
                    "`structure.pbc` enables periodicity but `structure.cell` is missing."
                        .to_string(),
                ));
            }
            None => Cell::default(),
        };
        let atoms = file.atoms.into_iter().map(Atom::from).collect();
        Ok(AtomicStructure::new(atoms, cell))
    }

    fn build_potential(registry: &KindRegistry, file: FilePotential) -> Result<Potential> {
        let mut potential = Potential::new(registry, &file.kind)?;
        if let Some(symbols) = file.symbols {
            potential.set_symbols(symbols)?;
        }
        if let Some(pattern) = file.symbol_pattern {
            potential.add_symbols(TargetInput::Table(pattern.expand()?))?;
        }
        if let Some(tags) = file.tags {
            potential.set_tags(tags)?;
        }
        if let Some(indices) = file.indices {
            potential.set_indices(indices)?;
        }
        if let Some(parameters) = file.parameters {
            potential.set_parameters(parameters)?;
        }
        if let Some(cutoff) = file.cutoff {
            potential.set_cutoff(cutoff)?;
        }
        if let Some(margin) = file.cutoff_margin {
            potential.set_cutoff_margin(margin)?;
        }
        if !file.bond_orders.is_empty() {
            let sets = file
                .bond_orders
                .into_iter()
                .map(|b| Self::build_bond_order(registry, b))
                .collect::<Result<Vec<_>>>()?;
            potential.set_coordinator(Some(Coordinator::new(sets)));
        }
        Ok(potential)
    }

    fn build_bond_order(registry: &KindRegistry, file: FileBondOrder) -> Result<BondOrderParameters> {
        let mut parameters = BondOrderParameters::new(registry, &file.kind)?;
        if let Some(symbols) = file.symbols {
            parameters.set_symbols(symbols)?;
        }
        if let Some(pattern) = file.symbol_pattern {
            parameters.add_symbols(TargetInput::Table(pattern.expand()?))?;
        }
        if let Some(values) = file.parameters {
            parameters.set_parameters(values)?;
        }
        if let Some(cutoff) = file.cutoff {
            parameters.set_cutoff(cutoff)?;
        }
        if let Some(margin) = file.cutoff_margin {
            parameters.set_cutoff_margin(margin)?;
        }
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const DIMER: &str = r#"
        [sync]
        skin = 0.3
        invalidation = "ignore-momenta"

        [structure]
        cell = [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]
        pbc = [true, true, true]

        [[structure.atoms]]
        symbol = "H"
        position = [0.0, 0.0, 0.0]

        [[structure.atoms]]
        symbol = "H"
        position = [0.74, 0.0, 0.0]
        charge = 0.1

        [[potentials]]
        kind = "LJ"
        symbols = ["H", "H"]
        parameters = [0.1, 2.5]
        cutoff = 4.0

        [[requests]]
        quantity = "energy"

        [[requests]]
        quantity = "forces"
        client = "other"
        set-momentum = { atom = 1, value = [0.0, 0.3, 0.0] }
    "#;

    fn write_scenario(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn load(dir: &TempDir, content: &str, overrides: SyncOverrides) -> Result<Scenario> {
        let path = write_scenario(dir, "scenario.toml", content);
        PartialScenario::from_file(&path)?.merge_with_cli(overrides, dir.path())
    }

    #[test]
    fn scenario_file_resolves_into_core_types() {
        let dir = tempdir().unwrap();
        let scenario = load(&dir, DIMER, SyncOverrides::default()).unwrap();

        assert_eq!(scenario.structure.len(), 2);
        assert_eq!(scenario.structure.charges(), &[0.0, 0.1]);
        assert!(scenario.structure.cell().is_periodic());
        assert_eq!(scenario.definitions.len(), 1);
        assert_eq!(scenario.definitions[0].parameter("sigma").unwrap(), 2.5);
        assert_eq!(scenario.sync.skin, 0.3);
        assert_eq!(scenario.sync.cutoff_scale, 0.5);
        assert_eq!(scenario.sync.invalidation, InvalidationPolicy::IgnoreMomenta);
        assert_eq!(scenario.requests.len(), 2);
        assert_eq!(scenario.requests[0].client, "main");
        assert_eq!(scenario.requests[1].quantity, RequestedQuantity::Forces);
    }

    #[test]
    fn command_line_flags_override_the_sync_table() {
        let dir = tempdir().unwrap();
        let path = write_scenario(&dir, "scenario.toml", DIMER);
        let cli = Cli::parse_from([
            "coremirror",
            "trace",
            "-c",
            path.to_str().unwrap(),
            "--force-full-init",
            "--skin",
            "0.1",
        ]);
        let Commands::Trace(args) = cli.command else {
            panic!("Expected 'trace' subcommand");
        };

        let scenario = PartialScenario::from_file(&path)
            .unwrap()
            .merge_with_cli(SyncOverrides::from(&args), dir.path())
            .unwrap();
        assert!(scenario.sync.force_full_initialization);
        assert_eq!(scenario.sync.skin, 0.1);
    }

    #[test]
    fn patterns_and_bond_orders_build_a_coordinated_definition() {
        let dir = tempdir().unwrap();
        let scenario = load(
            &dir,
            r#"
            [structure]
            [[structure.atoms]]
            symbol = "Si"
            position = [0.0, 0.0, 0.0]

            [[potentials]]
            kind = "bond_bending"
            symbol-pattern = { slots = [["O", "Si"], "Si", ["O"]], mode = "triplet" }
            parameters = [1.0, 1.91]
            cutoff = 3.0

            [[potentials.bond-orders]]
            kind = "tersoff"
            symbols = [["Si", "Si", "Si"]]
            parameters = [[1.1e-6, 0.787], [], [0.0, 1e5, 16.2, -0.6, 0.0]]
            cutoff = 3.0
            cutoff-margin = 0.2
            "#,
            SyncOverrides::default(),
        )
        .unwrap();

        let potential = &scenario.definitions[0];
        assert_eq!(potential.symbols().unwrap().tuples().len(), 3);
        let coordinator = potential.coordinator().unwrap();
        assert_eq!(coordinator.parameter_sets().len(), 1);
        assert_eq!(coordinator.parameter_sets()[0].cutoff_margin(), 0.2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let result = load(
            &dir,
            r#"
            [structure]
            atoms = []
            colour = "blue"
            "#,
            SyncOverrides::default(),
        );
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn invalid_definitions_surface_as_definition_errors() {
        let dir = tempdir().unwrap();
        let result = load(
            &dir,
            r#"
            [structure]
            atoms = []

            [[potentials]]
            kind = "LJ"
            symbols = ["H", "H", "H"]
            "#,
            SyncOverrides::default(),
        );
        assert!(matches!(result, Err(CliError::Definition(_))));
    }

    #[test]
    fn bond_order_requests_need_a_definition() {
        let dir = tempdir().unwrap();
        let result = load(
            &dir,
            r#"
            [structure]
            atoms = []

            [[requests]]
            quantity = "bond-order-factors"
            "#,
            SyncOverrides::default(),
        );
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn relative_registry_paths_are_resolved_next_to_the_scenario() {
        let dir = tempdir().unwrap();
        write_scenario(
            &dir,
            "kinds.toml",
            r#"
            [potentials.harmonic_well]
            targets = 1
            parameters = [{ name = "k" }]
            "#,
        );
        let scenario = load(
            &dir,
            r#"
            registry = "kinds.toml"
            [structure]
            atoms = []

            [[potentials]]
            kind = "harmonic_well"
            symbols = ["Na"]
            parameters = [2.0]
            "#,
            SyncOverrides::default(),
        )
        .unwrap();
        assert!(scenario.registry.is_potential("harmonic_well"));
        assert!(scenario.registry.is_potential("LJ"));
    }

    #[test]
    fn request_edits_apply_to_a_structure() {
        let dir = tempdir().unwrap();
        let scenario = load(&dir, DIMER, SyncOverrides::default()).unwrap();
        let mut structure = scenario.structure.clone();
        scenario.requests[1].apply(&mut structure).unwrap();
        assert_eq!(structure.momenta()[1], Vector3::new(0.0, 0.3, 0.0));
        assert!(structure.same_positions(&scenario.structure));
    }
}
