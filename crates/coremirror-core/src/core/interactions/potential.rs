use super::bond_order::Coordinator;
use super::cutoff::CutoffWindow;
use super::error::DefinitionError;
use super::kind::PotentialKind;
use super::registry::KindRegistry;
use super::targets::{TargetInput, TargetSet, TargetSpec};
use std::fmt;
use std::sync::Arc;

/// An interaction definition: kind, targets, parameters, cutoff and an
/// optional bond-order coordinator.
///
/// Every mutator validates its input and leaves the definition untouched on
/// error, so an existing `Potential` is always internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    kind: Arc<PotentialKind>,
    targets: TargetSet,
    parameters: Vec<f64>,
    window: CutoffWindow,
    coordinator: Option<Coordinator>,
}

impl Potential {
    pub fn new(registry: &KindRegistry, kind_name: &str) -> Result<Self, DefinitionError> {
        Ok(Self::from_kind(registry.potential(kind_name)?))
    }

    pub fn from_kind(kind: Arc<PotentialKind>) -> Self {
        let parameters = vec![0.0; kind.n_parameters()];
        Self {
            kind,
            targets: TargetSet::default(),
            parameters,
            window: CutoffWindow::default(),
            coordinator: None,
        }
    }

    pub fn with_symbols(mut self, symbols: TargetInput<String>) -> Result<Self, DefinitionError> {
        self.set_symbols(symbols)?;
        Ok(self)
    }

    pub fn with_tags(mut self, tags: TargetInput<i32>) -> Result<Self, DefinitionError> {
        self.set_tags(tags)?;
        Ok(self)
    }

    pub fn with_indices(mut self, indices: TargetInput<usize>) -> Result<Self, DefinitionError> {
        self.set_indices(indices)?;
        Ok(self)
    }

    pub fn with_parameters(mut self, parameters: Vec<f64>) -> Result<Self, DefinitionError> {
        self.set_parameters(parameters)?;
        Ok(self)
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Result<Self, DefinitionError> {
        self.set_cutoff(cutoff)?;
        Ok(self)
    }

    pub fn with_cutoff_margin(mut self, margin: f64) -> Result<Self, DefinitionError> {
        self.set_cutoff_margin(margin)?;
        Ok(self)
    }

    pub fn with_coordinator(mut self, coordinator: Coordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn kind(&self) -> &Arc<PotentialKind> {
        &self.kind
    }

    pub fn kind_name(&self) -> &str {
        &self.kind.name
    }

    pub fn n_targets(&self) -> usize {
        self.kind.n_targets
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn symbols(&self) -> Option<&TargetSpec<String>> {
        self.targets.get()
    }

    pub fn tags(&self) -> Option<&TargetSpec<i32>> {
        self.targets.get()
    }

    pub fn indices(&self) -> Option<&TargetSpec<usize>> {
        self.targets.get()
    }

    pub fn set_symbols(&mut self, symbols: TargetInput<String>) -> Result<(), DefinitionError> {
        self.targets.set(&self.kind.name, self.kind.n_targets, symbols)
    }

    pub fn add_symbols(&mut self, symbols: TargetInput<String>) -> Result<(), DefinitionError> {
        self.targets.add(&self.kind.name, self.kind.n_targets, symbols)
    }

    pub fn set_tags(&mut self, tags: TargetInput<i32>) -> Result<(), DefinitionError> {
        self.targets.set(&self.kind.name, self.kind.n_targets, tags)
    }

    pub fn add_tags(&mut self, tags: TargetInput<i32>) -> Result<(), DefinitionError> {
        self.targets.add(&self.kind.name, self.kind.n_targets, tags)
    }

    pub fn set_indices(&mut self, indices: TargetInput<usize>) -> Result<(), DefinitionError> {
        self.targets.set(&self.kind.name, self.kind.n_targets, indices)
    }

    pub fn add_indices(&mut self, indices: TargetInput<usize>) -> Result<(), DefinitionError> {
        self.targets.add(&self.kind.name, self.kind.n_targets, indices)
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<f64>) -> Result<(), DefinitionError> {
        if parameters.len() != self.kind.n_parameters() {
            return Err(DefinitionError::ParameterCount {
                kind: self.kind.name.clone(),
                expected: self.kind.n_parameters(),
                found: parameters.len(),
            });
        }
        self.parameters = parameters;
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Result<f64, DefinitionError> {
        Ok(self.parameters[self.locate(name)?])
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), DefinitionError> {
        let index = self.locate(name)?;
        self.parameters[index] = value;
        Ok(())
    }

    fn locate(&self, name: &str) -> Result<usize, DefinitionError> {
        self.kind
            .parameter_index(name)
            .ok_or_else(|| DefinitionError::UnknownParameter {
                kind: self.kind.name.clone(),
                parameter: name.to_string(),
            })
    }

    pub fn cutoff(&self) -> f64 {
        self.window.cutoff()
    }

    pub fn cutoff_margin(&self) -> f64 {
        self.window.margin()
    }

    pub fn soft_cutoff(&self) -> f64 {
        self.window.soft_cutoff()
    }

    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<(), DefinitionError> {
        self.window.set_cutoff(cutoff)
    }

    pub fn set_cutoff_margin(&mut self, margin: f64) -> Result<(), DefinitionError> {
        self.window.set_margin(margin)
    }

    pub fn set_soft_cutoff(&mut self, soft_cutoff: f64) -> Result<(), DefinitionError> {
        self.window.set_soft_cutoff(soft_cutoff)
    }

    pub fn coordinator(&self) -> Option<&Coordinator> {
        self.coordinator.as_ref()
    }

    pub fn set_coordinator(&mut self, coordinator: Option<Coordinator>) {
        self.coordinator = coordinator;
    }

    /// Every element symbol the symbol targets mention, in first-seen order.
    pub fn different_symbols(&self) -> Vec<String> {
        self.symbols()
            .map(TargetSpec::distinct_values)
            .unwrap_or_default()
    }

    pub fn different_tags(&self) -> Vec<i32> {
        self.tags().map(TargetSpec::distinct_values).unwrap_or_default()
    }

    pub fn different_indices(&self) -> Vec<usize> {
        self.indices()
            .map(TargetSpec::distinct_values)
            .unwrap_or_default()
    }
}

impl fmt::Display for Potential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "potential '{}'", self.kind.name)?;
        writeln!(f, "{}-body interaction", self.kind.n_targets)?;
        writeln!(f, "parameters:")?;
        for (spec, value) in self.kind.parameters.iter().zip(&self.parameters) {
            writeln!(f, "  {} = {}", spec.name, value)?;
        }
        writeln!(
            f,
            "cutoff = {} (smoothing from {})",
            self.cutoff(),
            self.soft_cutoff()
        )?;
        if let Some(symbols) = self.symbols() {
            writeln!(f, "symbol targets: {:?}", symbols.tuples())?;
        }
        if let Some(tags) = self.tags() {
            writeln!(f, "tag targets: {:?}", tags.tuples())?;
        }
        if let Some(indices) = self.indices() {
            writeln!(f, "index targets: {:?}", indices.tuples())?;
        }
        if let Some(coordinator) = &self.coordinator {
            writeln!(
                f,
                "scaled by {} bond order parameter set(s)",
                coordinator.parameter_sets().len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lj() -> Potential {
        Potential::new(&KindRegistry::builtin(), "LJ").unwrap()
    }

    #[test]
    fn unknown_kind_is_a_definition_error() {
        let err = Potential::new(&KindRegistry::builtin(), "Buckingham").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownPotential("Buckingham".to_string())
        );
    }

    #[test]
    fn builder_chain_produces_a_consistent_definition() {
        let potential = lj()
            .with_symbols(TargetInput::symbols(&["H", "H"]))
            .unwrap()
            .with_parameters(vec![0.1, 2.5])
            .unwrap()
            .with_cutoff(4.0)
            .unwrap()
            .with_cutoff_margin(0.5)
            .unwrap();
        assert_eq!(potential.parameter("sigma").unwrap(), 2.5);
        assert_eq!(potential.soft_cutoff(), 3.5);
        assert_eq!(potential.different_symbols(), vec!["H".to_string()]);
    }

    #[test]
    fn wrong_parameter_count_is_rejected_and_nothing_changes() {
        let mut potential = lj().with_parameters(vec![1.0, 2.0]).unwrap();
        let err = potential.set_parameters(vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::ParameterCount {
                kind: "LJ".to_string(),
                expected: 2,
                found: 1
            }
        );
        assert_eq!(potential.parameters(), &[1.0, 2.0]);
    }

    #[test]
    fn targets_of_each_kind_are_checked_against_the_arity() {
        let mut potential = lj();
        assert!(potential.set_tags(TargetInput::Tuple(vec![1, 2, 3])).is_err());
        assert!(potential.tags().is_none());
        potential.add_indices(TargetInput::Tuple(vec![0, 1])).unwrap();
        potential.add_indices(TargetInput::Table(vec![vec![2, 3]])).unwrap();
        assert_eq!(potential.indices().unwrap().tuples().len(), 2);
    }

    #[test]
    fn cutoff_margin_changes_make_definitions_differ() {
        let base = lj().with_cutoff(4.0).unwrap();
        let smoothed = base.clone().with_cutoff_margin(0.2).unwrap();
        assert_ne!(base, smoothed);
    }

    #[test]
    fn display_shows_parameter_values_and_targets() {
        let potential = lj()
            .with_symbols(TargetInput::symbols(&["Si", "O"]))
            .unwrap()
            .with_parameters(vec![0.1, 2.5])
            .unwrap();
        let text = potential.to_string();
        assert!(text.contains("potential 'LJ'"));
        assert!(text.contains("sigma = 2.5"));
        assert!(text.contains("symbol targets"));
    }
}
