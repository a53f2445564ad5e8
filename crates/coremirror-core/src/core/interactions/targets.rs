use super::error::DefinitionError;
use serde::Deserialize;
use std::fmt;
use std::hash::Hash;

/// The three ways an interaction can select the atoms it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Symbols,
    Tags,
    Indices,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Symbols => "symbol",
            TargetKind::Tags => "tag",
            TargetKind::Indices => "index",
        };
        f.write_str(name)
    }
}

/// A single target value as handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetLabel {
    Symbol(String),
    Tag(i32),
    Index(usize),
}

impl fmt::Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLabel::Symbol(s) => f.write_str(s),
            TargetLabel::Tag(t) => write!(f, "#{t}"),
            TargetLabel::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Value types usable as interaction targets.
pub trait TargetValue: Clone + PartialEq + Eq + Hash + fmt::Debug {
    const KIND: TargetKind;

    fn to_label(&self) -> TargetLabel;
    fn slot(set: &TargetSet) -> Option<&TargetSpec<Self>>;
    fn slot_mut(set: &mut TargetSet) -> &mut Option<TargetSpec<Self>>;
}

impl TargetValue for String {
    const KIND: TargetKind = TargetKind::Symbols;

    fn to_label(&self) -> TargetLabel {
        TargetLabel::Symbol(self.clone())
    }
    fn slot(set: &TargetSet) -> Option<&TargetSpec<Self>> {
        set.symbols.as_ref()
    }
    fn slot_mut(set: &mut TargetSet) -> &mut Option<TargetSpec<Self>> {
        &mut set.symbols
    }
}

impl TargetValue for i32 {
    const KIND: TargetKind = TargetKind::Tags;

    fn to_label(&self) -> TargetLabel {
        TargetLabel::Tag(*self)
    }
    fn slot(set: &TargetSet) -> Option<&TargetSpec<Self>> {
        set.tags.as_ref()
    }
    fn slot_mut(set: &mut TargetSet) -> &mut Option<TargetSpec<Self>> {
        &mut set.tags
    }
}

impl TargetValue for usize {
    const KIND: TargetKind = TargetKind::Indices;

    fn to_label(&self) -> TargetLabel {
        TargetLabel::Index(*self)
    }
    fn slot(set: &TargetSet) -> Option<&TargetSpec<Self>> {
        set.indices.as_ref()
    }
    fn slot_mut(set: &mut TargetSet) -> &mut Option<TargetSpec<Self>> {
        &mut set.indices
    }
}

/// Targets as written by a user: either one tuple or a list of tuples.
///
/// A lone tuple is treated as a list holding that tuple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TargetInput<T> {
    Table(Vec<Vec<T>>),
    Tuple(Vec<T>),
}

impl<T> TargetInput<T> {
    pub fn into_tuples(self) -> Vec<Vec<T>> {
        match self {
            TargetInput::Table(tuples) => tuples,
            TargetInput::Tuple(tuple) => vec![tuple],
        }
    }
}

impl TargetInput<String> {
    /// Convenience for a single tuple of element symbols.
    pub fn symbols(symbols: &[&str]) -> Self {
        TargetInput::Tuple(symbols.iter().map(|s| s.to_string()).collect())
    }
}

/// An ordered list of target tuples, each exactly as long as the interaction's arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec<T> {
    tuples: Vec<Vec<T>>,
}

impl<T: TargetValue> TargetSpec<T> {
    pub fn new(
        kind_name: &str,
        arity: usize,
        input: TargetInput<T>,
    ) -> Result<Self, DefinitionError> {
        let tuples = input.into_tuples();
        check_arity(kind_name, arity, &tuples)?;
        Ok(Self { tuples })
    }

    pub fn tuples(&self) -> &[Vec<T>] {
        &self.tuples
    }

    pub fn extend(
        &mut self,
        kind_name: &str,
        arity: usize,
        input: TargetInput<T>,
    ) -> Result<(), DefinitionError> {
        let tuples = input.into_tuples();
        check_arity(kind_name, arity, &tuples)?;
        self.tuples.extend(tuples);
        Ok(())
    }

    pub fn contains(&self, value: &T) -> bool {
        self.tuples.iter().any(|tuple| tuple.contains(value))
    }

    /// Every value appearing in any tuple, in first-seen order.
    pub fn distinct_values(&self) -> Vec<T> {
        let mut seen: Vec<T> = Vec::new();
        for value in self.tuples.iter().flatten() {
            if !seen.contains(value) {
                seen.push(value.clone());
            }
        }
        seen
    }
}

fn check_arity<T>(kind_name: &str, arity: usize, tuples: &[Vec<T>]) -> Result<(), DefinitionError>
where
    T: TargetValue,
{
    match tuples.iter().find(|tuple| tuple.len() != arity) {
        Some(bad) => Err(DefinitionError::TargetArity {
            kind: kind_name.to_string(),
            target: T::KIND,
            expected: arity,
            found: bad.len(),
        }),
        None => Ok(()),
    }
}

/// Symbol, tag and index targets of one interaction. Any subset may be present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetSet {
    symbols: Option<TargetSpec<String>>,
    tags: Option<TargetSpec<i32>>,
    indices: Option<TargetSpec<usize>>,
}

impl TargetSet {
    pub fn get<T: TargetValue>(&self) -> Option<&TargetSpec<T>> {
        T::slot(self)
    }

    pub fn set<T: TargetValue>(
        &mut self,
        kind_name: &str,
        arity: usize,
        input: TargetInput<T>,
    ) -> Result<(), DefinitionError> {
        *T::slot_mut(self) = Some(TargetSpec::new(kind_name, arity, input)?);
        Ok(())
    }

    pub fn add<T: TargetValue>(
        &mut self,
        kind_name: &str,
        arity: usize,
        input: TargetInput<T>,
    ) -> Result<(), DefinitionError> {
        if let Some(spec) = T::slot_mut(self) {
            return spec.extend(kind_name, arity, input);
        }
        *T::slot_mut(self) = Some(TargetSpec::new(kind_name, arity, input)?);
        Ok(())
    }

    pub fn clear<T: TargetValue>(&mut self) {
        *T::slot_mut(self) = None;
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_none() && self.tags.is_none() && self.indices.is_none()
    }

    /// Whether any tuple of any kind mentions the given atom.
    pub fn mentions_atom(&self, symbol: &str, tag: i32, index: usize) -> bool {
        let by_symbol = self
            .symbols
            .as_ref()
            .is_some_and(|spec| spec.tuples().iter().flatten().any(|s| s == symbol));
        let by_tag = self.tags.as_ref().is_some_and(|spec| spec.contains(&tag));
        let by_index = self
            .indices
            .as_ref()
            .is_some_and(|spec| spec.contains(&index));
        by_symbol || by_tag || by_index
    }
}
