use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value {value} for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// When cached quantities are thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Any push to the engine, and any change to the desired state, empties
    /// the whole cache.
    #[default]
    Conservative,
    /// Like `Conservative`, except that changes confined to momenta keep the
    /// cache. Only valid for engines whose energies, forces, stresses and
    /// electronegativities do not depend on momenta.
    IgnoreMomenta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Re-initialize the engine from scratch on every synchronization round.
    pub force_full_initialization: bool,
    /// Factor applied to each atom's largest cutoff to obtain its neighbor radius.
    pub cutoff_scale: f64,
    /// Extra distance added to neighbor radii so lists survive small moves.
    pub skin: f64,
    pub invalidation: InvalidationPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            force_full_initialization: false,
            cutoff_scale: 0.5,
            skin: 0.5,
            invalidation: InvalidationPolicy::Conservative,
        }
    }
}

#[derive(Default)]
pub struct SyncConfigBuilder {
    force_full_initialization: Option<bool>,
    cutoff_scale: Option<f64>,
    skin: Option<f64>,
    invalidation: Option<InvalidationPolicy>,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_full_initialization(mut self, force: bool) -> Self {
        self.force_full_initialization = Some(force);
        self
    }
    pub fn cutoff_scale(mut self, scale: f64) -> Self {
        self.cutoff_scale = Some(scale);
        self
    }
    pub fn skin(mut self, skin: f64) -> Self {
        self.skin = Some(skin);
        self
    }
    pub fn invalidation(mut self, policy: InvalidationPolicy) -> Self {
        self.invalidation = Some(policy);
        self
    }

    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let cutoff_scale = self.cutoff_scale.unwrap_or(defaults.cutoff_scale);
        if !(cutoff_scale.is_finite() && cutoff_scale > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "cutoff_scale",
                value: cutoff_scale,
                reason: "must be a positive number",
            });
        }
        let skin = self.skin.unwrap_or(defaults.skin);
        if !(skin.is_finite() && skin >= 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "skin",
                value: skin,
                reason: "must be a non-negative number",
            });
        }
        Ok(SyncConfig {
            force_full_initialization: self
                .force_full_initialization
                .unwrap_or(defaults.force_full_initialization),
            cutoff_scale,
            skin,
            invalidation: self.invalidation.unwrap_or(defaults.invalidation),
        })
    }
}
