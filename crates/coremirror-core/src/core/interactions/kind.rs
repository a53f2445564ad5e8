use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// An interaction type the engine knows how to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialKind {
    pub name: String,
    pub description: String,
    pub n_targets: usize,
    pub parameters: Vec<ParameterSpec>,
}

impl PotentialKind {
    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

impl fmt::Display for PotentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "potential '{}'", self.name)?;
        writeln!(f, "{}-body interaction", self.n_targets)?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        writeln!(f, "parameters:")?;
        for p in &self.parameters {
            writeln!(f, "  {}: {}", p.name, p.description)?;
        }
        Ok(())
    }
}

/// Where a named parameter lives inside a bond-order parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterIndex {
    pub arity_class: usize,
    pub position: usize,
}

/// A bond-order factor type.
///
/// Parameters come in arity classes: class `n` holds the parameters of the
/// `(n + 1)`-body part of the factor, so the number of classes is also the
/// number of targets.
#[derive(Debug, Clone, PartialEq)]
pub struct BondOrderKind {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Vec<ParameterSpec>>,
}

impl BondOrderKind {
    pub fn n_targets(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_counts(&self) -> Vec<usize> {
        self.parameters.iter().map(Vec::len).collect()
    }

    pub fn parameter_index(&self, name: &str) -> Option<ParameterIndex> {
        self.parameters
            .iter()
            .enumerate()
            .find_map(|(arity_class, class)| {
                class
                    .iter()
                    .position(|p| p.name == name)
                    .map(|position| ParameterIndex {
                        arity_class,
                        position,
                    })
            })
    }
}

impl fmt::Display for BondOrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bond order factor '{}'", self.name)?;
        writeln!(f, "{}-body factor", self.n_targets())?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        for (class, params) in self.parameters.iter().enumerate() {
            writeln!(f, "{}-body parameters:", class + 1)?;
            for p in params {
                writeln!(f, "  {}: {}", p.name, p.description)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionKind {
    Potential(Arc<PotentialKind>),
    BondOrder(Arc<BondOrderKind>),
}

impl InteractionKind {
    pub fn name(&self) -> &str {
        match self {
            InteractionKind::Potential(k) => &k.name,
            InteractionKind::BondOrder(k) => &k.name,
        }
    }

    pub fn n_targets(&self) -> usize {
        match self {
            InteractionKind::Potential(k) => k.n_targets,
            InteractionKind::BondOrder(k) => k.n_targets(),
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionKind::Potential(k) => write!(f, "{k}"),
            InteractionKind::BondOrder(k) => write!(f, "{k}"),
        }
    }
}
