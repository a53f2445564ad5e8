use super::targets::TargetKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("There is no potential kind called '{0}'")]
    UnknownPotential(String),

    #[error("There is no bond-order factor kind called '{0}'")]
    UnknownBondOrder(String),

    #[error("'{kind}' acts on {expected} atoms, but a {target} tuple of length {found} was given")]
    TargetArity {
        kind: String,
        target: TargetKind,
        expected: usize,
        found: usize,
    },

    #[error("'{kind}' takes {expected} parameters, but {found} were given")]
    ParameterCount {
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("'{kind}' takes parameters shaped {expected:?} per arity class, but {found:?} were given")]
    ParameterShape {
        kind: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("'{kind}' has no parameter called '{parameter}'")]
    UnknownParameter { kind: String, parameter: String },

    #[error("Cutoff must be finite and non-negative, got {cutoff}")]
    InvalidCutoff { cutoff: f64 },

    #[error("Cutoff margin must be finite and non-negative, got {margin}")]
    InvalidCutoffMargin { margin: f64 },

    #[error("Cutoff margin {margin} is larger than the cutoff {cutoff}")]
    CutoffMarginExceedsCutoff { margin: f64, cutoff: f64 },

    #[error("Malformed expansion pattern: {0}")]
    MalformedPattern(String),
}
