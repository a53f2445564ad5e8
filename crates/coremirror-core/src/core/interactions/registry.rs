use super::error::DefinitionError;
use super::kind::{BondOrderKind, InteractionKind, ParameterSpec, PotentialKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Kind '{name}' is defined both as a potential and as a bond-order factor")]
    Ambiguous { name: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PotentialEntry {
    #[serde(default)]
    description: String,
    targets: usize,
    #[serde(default)]
    parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BondOrderEntry {
    #[serde(default)]
    description: String,
    parameters: Vec<Vec<ParameterSpec>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RegistryFile {
    #[serde(default)]
    potentials: BTreeMap<String, PotentialEntry>,
    #[serde(default)]
    bond_order_factors: BTreeMap<String, BondOrderEntry>,
}

/// Every interaction and bond-order kind the engine can evaluate, by name.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    potentials: BTreeMap<String, Arc<PotentialKind>>,
    bond_orders: BTreeMap<String, Arc<BondOrderKind>>,
}

fn params(list: &[(&str, &str)]) -> Vec<ParameterSpec> {
    list.iter()
        .map(|(name, description)| ParameterSpec::new(name, description))
        .collect()
}

impl KindRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The kinds every engine build provides.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        let potentials = [
            (
                "LJ",
                "Lennard-Jones potential, V(r) = 4 epsilon ((sigma/r)^12 - (sigma/r)^6)",
                2,
                params(&[("epsilon", "energy scale"), ("sigma", "length scale")]),
            ),
            (
                "spring",
                "harmonic pair spring, V(r) = k/2 (r - R_0)^2",
                2,
                params(&[("k", "spring constant"), ("R_0", "equilibrium separation")]),
            ),
            (
                "constant_force",
                "constant external force, V = -F . r",
                1,
                params(&[("f_x", "force x"), ("f_y", "force y"), ("f_z", "force z")]),
            ),
            (
                "constant_potential",
                "constant energy per atom",
                1,
                params(&[("energy", "energy shift")]),
            ),
            (
                "charge_self",
                "charge self energy, V(q) = chi q + eta/2 q^2",
                1,
                params(&[("chi", "electronegativity"), ("eta", "chemical hardness")]),
            ),
            (
                "bond_bending",
                "angle bending around the centre atom, V = k/2 (cos theta - cos theta_0)^2",
                3,
                params(&[("k", "bending constant"), ("theta_0", "equilibrium angle")]),
            ),
        ];
        for (name, description, n_targets, parameters) in potentials {
            registry.register_potential(PotentialKind {
                name: name.to_string(),
                description: description.to_string(),
                n_targets,
                parameters,
            });
        }

        let bond_orders = [
            (
                "neighbors",
                "number of neighbors within the cutoff",
                vec![Vec::new(), Vec::new()],
            ),
            (
                "tersoff",
                "Tersoff-like bond order factor",
                vec![
                    params(&[("beta", "prefactor"), ("eta", "exponent")]),
                    Vec::new(),
                    params(&[
                        ("mu", "decay"),
                        ("a", "angular prefactor"),
                        ("c", "angular numerator"),
                        ("d", "angular denominator"),
                        ("h", "cosine shift"),
                    ]),
                ],
            ),
            (
                "c_scale",
                "coordination scaling",
                vec![params(&[
                    ("epsilon", "scaling"),
                    ("N", "target coordination"),
                    ("C", "decay"),
                    ("hardness", "steepness"),
                ])],
            ),
        ];
        for (name, description, parameters) in bond_orders {
            registry.register_bond_order(BondOrderKind {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            });
        }

        registry
    }

    /// Loads extra kinds from a TOML file with `[potentials.<name>]` and
    /// `[bond-order-factors.<name>]` tables.
    pub fn load(path: &Path) -> Result<Self, RegistryLoadError> {
        let mut registry = Self::empty();
        registry.extend_from_file(path)?;
        Ok(registry)
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<(), RegistryLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: RegistryFile = toml::from_str(&content).map_err(|e| RegistryLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        for (name, entry) in file.potentials {
            if self.bond_orders.contains_key(&name) {
                return Err(RegistryLoadError::Ambiguous { name });
            }
            self.register_potential(PotentialKind {
                name,
                description: entry.description,
                n_targets: entry.targets,
                parameters: entry.parameters,
            });
        }
        for (name, entry) in file.bond_order_factors {
            if self.potentials.contains_key(&name) {
                return Err(RegistryLoadError::Ambiguous { name });
            }
            self.register_bond_order(BondOrderKind {
                name,
                description: entry.description,
                parameters: entry.parameters,
            });
        }
        Ok(())
    }

    pub fn register_potential(&mut self, kind: PotentialKind) {
        self.potentials.insert(kind.name.clone(), Arc::new(kind));
    }

    pub fn register_bond_order(&mut self, kind: BondOrderKind) {
        self.bond_orders.insert(kind.name.clone(), Arc::new(kind));
    }

    pub fn potential(&self, name: &str) -> Result<Arc<PotentialKind>, DefinitionError> {
        self.potentials
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::UnknownPotential(name.to_string()))
    }

    pub fn bond_order(&self, name: &str) -> Result<Arc<BondOrderKind>, DefinitionError> {
        self.bond_orders
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::UnknownBondOrder(name.to_string()))
    }

    pub fn resolve(&self, name: &str) -> Option<InteractionKind> {
        self.potentials
            .get(name)
            .map(|k| InteractionKind::Potential(Arc::clone(k)))
            .or_else(|| {
                self.bond_orders
                    .get(name)
                    .map(|k| InteractionKind::BondOrder(Arc::clone(k)))
            })
    }

    pub fn is_potential(&self, name: &str) -> bool {
        self.potentials.contains_key(name)
    }

    pub fn is_bond_order(&self, name: &str) -> bool {
        self.bond_orders.contains_key(name)
    }

    pub fn potential_names(&self) -> impl Iterator<Item = &str> {
        self.potentials.keys().map(String::as_str)
    }

    pub fn bond_order_names(&self) -> impl Iterator<Item = &str> {
        self.bond_orders.keys().map(String::as_str)
    }

    /// Number of targets of a kind, if the name is known.
    pub fn n_targets(&self, name: &str) -> Option<usize> {
        self.resolve(name).map(|kind| kind.n_targets())
    }

    /// Names of the parameters of a potential kind.
    pub fn parameter_names(&self, name: &str) -> Option<Vec<String>> {
        self.potentials.get(name).map(|k| {
            k.parameters.iter().map(|p| p.name.clone()).collect()
        })
    }

    /// Parameter counts per arity class of a bond-order kind.
    pub fn bond_order_parameter_counts(&self, name: &str) -> Option<Vec<usize>> {
        self.bond_orders.get(name).map(|k| k.parameter_counts())
    }

    pub fn describe(&self, name: &str) -> Option<String> {
        self.resolve(name).map(|kind| kind.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_registry_knows_the_standard_kinds() {
        let registry = KindRegistry::builtin();
        assert!(registry.is_potential("LJ"));
        assert!(registry.is_bond_order("tersoff"));
        assert!(!registry.is_potential("tersoff"));
        assert_eq!(registry.n_targets("bond_bending"), Some(3));
        assert_eq!(
            registry.parameter_names("LJ"),
            Some(vec!["epsilon".to_string(), "sigma".to_string()])
        );
        assert_eq!(
            registry.bond_order_parameter_counts("tersoff"),
            Some(vec![2, 0, 5])
        );
    }

    #[test]
    fn unknown_names_produce_definition_errors() {
        let registry = KindRegistry::builtin();
        assert_eq!(
            registry.potential("Morse").unwrap_err(),
            DefinitionError::UnknownPotential("Morse".to_string())
        );
        assert!(registry.bond_order("LJ").is_err());
        assert!(registry.resolve("Morse").is_none());
    }

    #[test]
    fn describe_renders_the_kind() {
        let registry = KindRegistry::builtin();
        let text = registry.describe("spring").unwrap();
        assert!(text.contains("potential 'spring'"));
        assert!(text.contains("R_0"));
    }

    #[test]
    fn load_reads_potentials_and_bond_orders_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[potentials.Morse]
description = "Morse pair potential"
targets = 2
parameters = [
    {{ name = "D_e", description = "well depth" }},
    {{ name = "a", description = "width" }},
    {{ name = "r_e", description = "equilibrium distance" }},
]

[bond-order-factors.coordination]
parameters = [[{{ name = "k" }}], []]
"#
        )
        .unwrap();

        let registry = KindRegistry::load(file.path()).unwrap();
        let morse = registry.potential("Morse").unwrap();
        assert_eq!(morse.n_targets, 2);
        assert_eq!(morse.n_parameters(), 3);
        assert_eq!(
            registry.bond_order_parameter_counts("coordination"),
            Some(vec![1, 0])
        );
        assert!(!registry.is_potential("LJ"));
    }

    #[test]
    fn extending_the_builtin_registry_rejects_kind_name_clashes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[potentials.tersoff]\ntargets = 3").unwrap();

        let mut registry = KindRegistry::builtin();
        let err = registry.extend_from_file(file.path()).unwrap_err();
        assert!(matches!(err, RegistryLoadError::Ambiguous { name } if name == "tersoff"));
    }

    #[test]
    fn load_reports_missing_files_and_bad_toml() {
        let missing = KindRegistry::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(RegistryLoadError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[potentials.LJ]\ntargets = \"two\"").unwrap();
        assert!(matches!(
            KindRegistry::load(file.path()),
            Err(RegistryLoadError::Toml { .. })
        ));
    }
}
