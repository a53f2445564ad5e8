use super::cutoff::CutoffWindow;
use super::error::DefinitionError;
use super::kind::{BondOrderKind, ParameterIndex};
use super::registry::KindRegistry;
use super::targets::{TargetInput, TargetSpec};
use std::sync::Arc;

/// Parameters of one bond-order factor, targeting atoms by element symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BondOrderParameters {
    kind: Arc<BondOrderKind>,
    symbols: Option<TargetSpec<String>>,
    parameters: Vec<Vec<f64>>,
    window: CutoffWindow,
}

impl BondOrderParameters {
    pub fn new(registry: &KindRegistry, kind_name: &str) -> Result<Self, DefinitionError> {
        Ok(Self::from_kind(registry.bond_order(kind_name)?))
    }

    /// A parameter set with every parameter zeroed.
    pub fn from_kind(kind: Arc<BondOrderKind>) -> Self {
        let parameters = kind.parameter_counts().into_iter().map(|n| vec![0.0; n]).collect();
        Self {
            kind,
            symbols: None,
            parameters,
            window: CutoffWindow::default(),
        }
    }

    pub fn with_symbols(mut self, symbols: TargetInput<String>) -> Result<Self, DefinitionError> {
        self.set_symbols(symbols)?;
        Ok(self)
    }

    pub fn with_parameters(mut self, parameters: Vec<Vec<f64>>) -> Result<Self, DefinitionError> {
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

    pub fn kind(&self) -> &Arc<BondOrderKind> {
        &self.kind
    }

    pub fn kind_name(&self) -> &str {
        &self.kind.name
    }

    pub fn n_targets(&self) -> usize {
        self.kind.n_targets()
    }

    pub fn symbols(&self) -> Option<&TargetSpec<String>> {
        self.symbols.as_ref()
    }

    pub fn set_symbols(&mut self, symbols: TargetInput<String>) -> Result<(), DefinitionError> {
        self.symbols = Some(TargetSpec::new(&self.kind.name, self.n_targets(), symbols)?);
        Ok(())
    }

    pub fn add_symbols(&mut self, symbols: TargetInput<String>) -> Result<(), DefinitionError> {
        let arity = self.n_targets();
        match &mut self.symbols {
            Some(spec) => spec.extend(&self.kind.name, arity, symbols),
            None => self.set_symbols(symbols),
        }
    }

    pub fn parameters(&self) -> &[Vec<f64>] {
        &self.parameters
    }

    /// Parameters of every arity class concatenated in class order.
    pub fn flat_parameters(&self) -> Vec<f64> {
        self.parameters.iter().flatten().copied().collect()
    }

    pub fn parameter_counts(&self) -> Vec<usize> {
        self.parameters.iter().map(Vec::len).collect()
    }

    pub fn accepts_parameters(&self, parameters: &[Vec<f64>]) -> bool {
        parameters.iter().map(Vec::len).eq(self.kind.parameter_counts())
    }

    pub fn set_parameters(&mut self, parameters: Vec<Vec<f64>>) -> Result<(), DefinitionError> {
        if !self.accepts_parameters(&parameters) {
            return Err(DefinitionError::ParameterShape {
                kind: self.kind.name.clone(),
                expected: self.kind.parameter_counts(),
                found: parameters.iter().map(Vec::len).collect(),
            });
        }
        self.parameters = parameters;
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Result<f64, DefinitionError> {
        let index = self.locate(name)?;
        Ok(self.parameters[index.arity_class][index.position])
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), DefinitionError> {
        let index = self.locate(name)?;
        self.parameters[index.arity_class][index.position] = value;
        Ok(())
    }

    fn locate(&self, name: &str) -> Result<ParameterIndex, DefinitionError> {
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

    /// Every element symbol the parameter set mentions, in first-seen order.
    pub fn different_symbols(&self) -> Vec<String> {
        self.symbols
            .as_ref()
            .map(TargetSpec::distinct_values)
            .unwrap_or_default()
    }
}

/// Groups the bond-order parameter sets that scale one potential.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coordinator {
    parameter_sets: Vec<BondOrderParameters>,
}

impl Coordinator {
    pub fn new(parameter_sets: Vec<BondOrderParameters>) -> Self {
        Self { parameter_sets }
    }

    pub fn parameter_sets(&self) -> &[BondOrderParameters] {
        &self.parameter_sets
    }

    pub fn set_parameter_sets(&mut self, parameter_sets: Vec<BondOrderParameters>) {
        self.parameter_sets = parameter_sets;
    }

    pub fn add_parameter_set(&mut self, parameters: BondOrderParameters) {
        self.parameter_sets.push(parameters);
    }

    pub fn is_empty(&self) -> bool {
        self.parameter_sets.is_empty()
    }

    /// Largest hard cutoff among parameter sets that mention `symbol`.
    pub fn max_cutoff_for(&self, symbol: &str) -> Option<f64> {
        self.parameter_sets
            .iter()
            .filter(|set| set.symbols().is_some_and(|spec| spec.contains(&symbol.to_string())))
            .map(BondOrderParameters::cutoff)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> KindRegistry {
        KindRegistry::builtin()
    }

    #[test]
    fn new_parameter_sets_are_zeroed_per_arity_class() {
        let params = BondOrderParameters::new(&registry(), "tersoff").unwrap();
        assert_eq!(params.parameter_counts(), vec![2, 0, 5]);
        assert!(params.flat_parameters().iter().all(|&v| v == 0.0));
        assert_eq!(params.n_targets(), 3);
    }

    #[test]
    fn parameters_must_match_the_kind_shape() {
        let mut params = BondOrderParameters::new(&registry(), "tersoff").unwrap();
        let err = params.set_parameters(vec![vec![1.0], vec![], vec![]]).unwrap_err();
        assert!(matches!(err, DefinitionError::ParameterShape { .. }));

        params
            .set_parameters(vec![vec![1.0, 2.0], vec![], vec![3.0, 4.0, 5.0, 6.0, 7.0]])
            .unwrap();
        assert_eq!(params.flat_parameters(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn named_parameters_are_read_and_written_in_place() {
        let mut params = BondOrderParameters::new(&registry(), "tersoff").unwrap();
        params.set_parameter("h", -0.5).unwrap();
        assert_eq!(params.parameter("h").unwrap(), -0.5);
        assert_eq!(params.parameters()[2][4], -0.5);
        assert!(matches!(
            params.set_parameter("nope", 1.0),
            Err(DefinitionError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn symbols_follow_the_kind_arity() {
        let params = BondOrderParameters::new(&registry(), "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "O"]))
            .unwrap();
        assert_eq!(params.different_symbols(), vec!["Si".to_string(), "O".to_string()]);

        let err = BondOrderParameters::new(&registry(), "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si"]))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::TargetArity { expected: 2, found: 1, .. }));
    }

    #[test]
    fn coordinator_cutoff_only_counts_sets_mentioning_the_symbol() {
        let near = BondOrderParameters::new(&registry(), "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "Si"]))
            .unwrap()
            .with_cutoff(2.5)
            .unwrap();
        let far = BondOrderParameters::new(&registry(), "neighbors")
            .unwrap()
            .with_symbols(TargetInput::symbols(&["Si", "O"]))
            .unwrap()
            .with_cutoff(3.5)
            .unwrap();
        let coordinator = Coordinator::new(vec![near, far]);
        assert_eq!(coordinator.max_cutoff_for("Si"), Some(3.5));
        assert_eq!(coordinator.max_cutoff_for("O"), Some(3.5));
        assert_eq!(coordinator.max_cutoff_for("H"), None);
    }
}
