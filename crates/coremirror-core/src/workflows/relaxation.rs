use crate::engine::adapter::EngineAdapter;
use crate::engine::controller::SyncController;
use crate::engine::error::SyncError;
use crate::engine::handle::EngineHandle;
use crate::engine::progress::{Progress, ProgressReporter};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum RelaxationError {
    #[error("Unknown charge relaxation mode '{0}'")]
    UnknownMode(String),
    #[error("Missing required relaxation parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value {value} for relaxation parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("Charge relaxation failed: {0}")]
    Sync(#[from] SyncError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxationMode {
    /// Damped charge dynamics integrated with velocity Verlet.
    Dynamic,
}

impl RelaxationMode {
    pub fn name(&self) -> &'static str {
        match self {
            RelaxationMode::Dynamic => "dynamic",
        }
    }

    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            RelaxationMode::Dynamic => &["n_steps", "timestep", "inertia", "friction", "tolerance"],
        }
    }

    pub fn parameter_descriptions(&self) -> &'static [&'static str] {
        match self {
            RelaxationMode::Dynamic => &[
                "maximum number of charge dynamics steps",
                "time step of charge dynamics",
                "fictitious charge mass",
                "friction coefficient of the damped dynamics",
                "largest charge force accepted as converged",
            ],
        }
    }
}

impl fmt::Display for RelaxationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelaxationMode {
    type Err = RelaxationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamic" => Ok(RelaxationMode::Dynamic),
            other => Err(RelaxationError::UnknownMode(other.to_string())),
        }
    }
}

/// Parameters of damped dynamic charge relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRelaxation {
    pub n_steps: usize,
    pub timestep: f64,
    pub inertia: f64,
    pub friction: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationOutcome {
    pub steps: usize,
    /// Largest absolute charge force after the last step.
    pub residual: f64,
    pub converged: bool,
    pub charges: Vec<f64>,
}

#[derive(Default)]
pub struct ChargeRelaxationBuilder {
    n_steps: Option<usize>,
    timestep: Option<f64>,
    inertia: Option<f64>,
    friction: Option<f64>,
    tolerance: Option<f64>,
}

impl ChargeRelaxationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }
    pub fn timestep(mut self, timestep: f64) -> Self {
        self.timestep = Some(timestep);
        self
    }
    pub fn inertia(mut self, inertia: f64) -> Self {
        self.inertia = Some(inertia);
        self
    }
    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = Some(friction);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<ChargeRelaxation, RelaxationError> {
        let n_steps = self
            .n_steps
            .ok_or(RelaxationError::MissingParameter("n_steps"))?;
        let timestep = positive(
            "timestep",
            self.timestep
                .ok_or(RelaxationError::MissingParameter("timestep"))?,
        )?;
        let inertia = positive(
            "inertia",
            self.inertia
                .ok_or(RelaxationError::MissingParameter("inertia"))?,
        )?;
        let friction = self
            .friction
            .ok_or(RelaxationError::MissingParameter("friction"))?;
        if !(friction.is_finite() && friction >= 0.0) {
            return Err(RelaxationError::InvalidParameter {
                parameter: "friction",
                value: friction,
                reason: "must be a non-negative number",
            });
        }
        let tolerance = positive(
            "tolerance",
            self.tolerance
                .ok_or(RelaxationError::MissingParameter("tolerance"))?,
        )?;
        Ok(ChargeRelaxation {
            n_steps,
            timestep,
            inertia,
            friction,
            tolerance,
        })
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, RelaxationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RelaxationError::InvalidParameter {
            parameter,
            value,
            reason: "must be a positive number",
        })
    }
}

/// Charge forces drive charge from high to low electronegativity.
fn charge_forces<A: EngineAdapter>(
    controller: &mut SyncController,
    engine: &mut EngineHandle<A>,
) -> Result<Vec<f64>, SyncError> {
    Ok(controller
        .electronegativity_differences(engine)?
        .into_iter()
        .map(|difference| -difference)
        .collect())
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}

impl ChargeRelaxation {
    pub fn mode(&self) -> RelaxationMode {
        RelaxationMode::Dynamic
    }

    /// Relaxes the charges of the controller's structure in place.
    ///
    /// Every step sets new charges on the controller and asks it for
    /// electronegativities, so each evaluation pushes only the charges. Total
    /// charge is conserved because the forces have zero mean.
    #[instrument(skip_all, name = "charge_relaxation")]
    pub fn run<A: EngineAdapter>(
        &self,
        controller: &mut SyncController,
        engine: &mut EngineHandle<A>,
        reporter: &ProgressReporter,
    ) -> Result<RelaxationOutcome, RelaxationError> {
        let mut charges = controller
            .structure()
            .ok_or(SyncError::MissingStructure)?
            .charges()
            .to_vec();
        let dt = self.timestep;
        let inv_mass = 1.0 / self.inertia;
        let damping = 1.0 - 0.5 * self.friction * dt;
        let future_damping = 1.0 / (1.0 + 0.5 * self.friction * dt);

        reporter.report(Progress::PhaseStart {
            name: "Charge Relaxation",
        });
        reporter.report(Progress::TaskStart {
            total_steps: self.n_steps as u64,
        });

        let mut rates = vec![0.0; charges.len()];
        let mut forces = charge_forces(controller, engine)?;
        let mut residual = max_abs(&forces);
        let mut steps = 0;

        while residual > self.tolerance && steps < self.n_steps {
            for ((charge, rate), force) in charges.iter_mut().zip(&mut rates).zip(&forces) {
                *charge += *rate * dt + 0.5 * (force - self.friction * *rate) * inv_mass * dt * dt;
                *rate = damping * *rate + 0.5 * force * inv_mass * dt;
            }
            controller.set_charges(charges.clone())?;
            forces = charge_forces(controller, engine)?;
            for (rate, force) in rates.iter_mut().zip(&forces) {
                *rate = future_damping * (*rate + 0.5 * force * inv_mass * dt);
            }

            steps += 1;
            residual = max_abs(&forces);
            debug!(step = steps, residual, "Charge dynamics step.");
            reporter.report(Progress::TaskIncrement { residual });
        }

        let converged = residual <= self.tolerance;
        if converged {
            info!(steps, residual, "Charge relaxation converged.");
        } else {
            warn!(
                steps,
                residual,
                tolerance = self.tolerance,
                "Charge relaxation stopped before converging."
            );
        }
        reporter.report(Progress::TaskFinish { converged });
        reporter.report(Progress::PhaseFinish);

        Ok(RelaxationOutcome {
            steps,
            residual,
            converged,
            charges,
        })
    }
}
