//! Central-difference derivatives for checking engine results.
//!
//! Every displaced evaluation goes through the controller, so these routines
//! also exercise the synchronization path. The controller's structure is
//! restored afterwards, whether or not the evaluations succeeded.

use crate::core::models::structure::AtomicStructure;
use crate::engine::adapter::EngineAdapter;
use crate::engine::controller::SyncController;
use crate::engine::error::SyncError;
use crate::engine::handle::EngineHandle;
use nalgebra::Vector3;
use tracing::instrument;

pub const DEFAULT_SHIFT: f64 = 0.001;

fn restoring<T>(
    controller: &mut SyncController,
    evaluate: impl FnOnce(&mut SyncController, &AtomicStructure) -> Result<T, SyncError>,
) -> Result<T, SyncError> {
    let original = controller
        .structure()
        .cloned()
        .ok_or(SyncError::MissingStructure)?;
    let result = evaluate(controller, &original);
    controller.set_structure(original);
    result
}

fn displaced(
    original: &AtomicStructure,
    atom: usize,
    delta: Vector3<f64>,
) -> Result<AtomicStructure, SyncError> {
    let mut structure = original.clone();
    structure.translate_atom(atom, delta)?;
    Ok(structure)
}

/// Central difference of `value` along each Cartesian axis of `moved_atom`.
fn positional_gradient<A: EngineAdapter>(
    controller: &mut SyncController,
    engine: &mut EngineHandle<A>,
    moved_atom: usize,
    shift: f64,
    mut value: impl FnMut(&mut SyncController, &mut EngineHandle<A>) -> Result<f64, SyncError>,
) -> Result<Vector3<f64>, SyncError> {
    restoring(controller, |controller, original| {
        original.check_index(moved_atom)?;
        let mut gradient = Vector3::zeros();
        for axis in 0..3 {
            let step = Vector3::ith(axis, shift);
            controller.set_structure(displaced(original, moved_atom, step)?);
            let plus = value(controller, engine)?;
            controller.set_structure(displaced(original, moved_atom, -step)?);
            let minus = value(controller, engine)?;
            gradient[axis] = (plus - minus) / (2.0 * shift);
        }
        Ok(gradient)
    })
}

/// Force on `atom` as the negative central-difference energy gradient.
#[instrument(skip_all, fields(atom = atom))]
pub fn numerical_force<A: EngineAdapter>(
    controller: &mut SyncController,
    engine: &mut EngineHandle<A>,
    atom: usize,
    shift: f64,
) -> Result<Vector3<f64>, SyncError> {
    let gradient = positional_gradient(controller, engine, atom, shift, |controller, engine| {
        controller.energy(engine)
    })?;
    Ok(-gradient)
}

/// Electronegativity of `atom` as the central-difference derivative dE/dq.
#[instrument(skip_all, fields(atom = atom))]
pub fn numerical_electronegativity<A: EngineAdapter>(
    controller: &mut SyncController,
    engine: &mut EngineHandle<A>,
    atom: usize,
    shift: f64,
) -> Result<f64, SyncError> {
    restoring(controller, |controller, original| {
        original.check_index(atom)?;
        let charge = original.charges()[atom];
        let mut energies = [0.0; 2];
        for (energy, sign) in energies.iter_mut().zip([1.0, -1.0]) {
            let mut structure = original.clone();
            structure.set_charge(atom, charge + sign * shift)?;
            controller.set_structure(structure);
            *energy = controller.energy(engine)?;
        }
        Ok((energies[0] - energies[1]) / (2.0 * shift))
    })
}

/// Gradient of the bond-order factor of `atom` with respect to moving `moved_atom`.
#[instrument(skip_all, fields(definition_index = definition_index, atom = atom, moved_atom = moved_atom))]
pub fn numerical_bond_order_gradient<A: EngineAdapter>(
    controller: &mut SyncController,
    engine: &mut EngineHandle<A>,
    definition_index: usize,
    atom: usize,
    moved_atom: usize,
    shift: f64,
) -> Result<Vector3<f64>, SyncError> {
    positional_gradient(controller, engine, moved_atom, shift, |controller, engine| {
        let factors = controller.bond_order_factors(engine, definition_index)?;
        factors.get(atom).copied().ok_or_else(|| {
            SyncError::Internal(format!(
                "engine returned {} bond-order factors, atom {atom} requested",
                factors.len()
            ))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::{Atom, Cell};
    use crate::engine::recording::{EngineState, RecordingEngine, ResponseModel};
    use nalgebra::Point3;

    /// Harmonic springs between consecutive atoms plus a quadratic charge term.
    #[derive(Debug)]
    struct Springs;

    impl ResponseModel for Springs {
        fn energy(&self, state: &EngineState) -> f64 {
            let bonds: f64 = state
                .positions
                .windows(2)
                .map(|pair| 0.5 * ((pair[1] - pair[0]).norm() - 1.0).powi(2))
                .sum();
            let charges: f64 = state.charges.iter().map(|q| q * q).sum();
            bonds + charges
        }

        fn forces(&self, state: &EngineState) -> Vec<Vector3<f64>> {
            let mut forces = vec![Vector3::zeros(); state.positions.len()];
            for i in 1..state.positions.len() {
                let d = state.positions[i] - state.positions[i - 1];
                let f = -(d.norm() - 1.0) * d.normalize();
                forces[i] += f;
                forces[i - 1] -= f;
            }
            forces
        }
    }

    fn chain() -> (SyncController, EngineHandle<RecordingEngine>) {
        let mut controller = SyncController::default();
        controller.set_structure(AtomicStructure::new(
            vec![
                Atom::new("C", Point3::new(0.0, 0.0, 0.0)),
                Atom::new("C", Point3::new(1.3, 0.2, 0.0)).with_charge(0.25),
                Atom::new("C", Point3::new(2.1, 0.9, 0.4)),
            ],
            Cell::default(),
        ));
        (controller, EngineHandle::new(RecordingEngine::with_model(Springs)))
    }

    #[test]
    fn numerical_force_matches_the_analytic_force() {
        let (mut controller, mut engine) = chain();
        let analytic = controller.forces(&mut engine).unwrap();
        for atom in 0..3 {
            let numerical = numerical_force(&mut controller, &mut engine, atom, DEFAULT_SHIFT).unwrap();
            assert!((numerical - analytic[atom]).norm() < 1e-5, "atom {atom}");
        }
    }

    #[test]
    fn numerical_electronegativity_differentiates_energy_by_charge() {
        let (mut controller, mut engine) = chain();
        let chi = numerical_electronegativity(&mut controller, &mut engine, 1, DEFAULT_SHIFT).unwrap();
        assert!((chi - 0.5).abs() < 1e-9);
    }

    #[test]
    fn the_original_structure_is_restored() {
        let (mut controller, mut engine) = chain();
        let before = controller.structure().cloned();
        numerical_force(&mut controller, &mut engine, 2, DEFAULT_SHIFT).unwrap();
        assert_eq!(controller.structure().cloned(), before);

        assert!(numerical_force(&mut controller, &mut engine, 9, DEFAULT_SHIFT).is_err());
        assert_eq!(controller.structure().cloned(), before);
    }

    #[test]
    fn displaced_evaluations_push_only_coordinates() {
        let (mut controller, mut engine) = chain();
        controller.energy(&mut engine).unwrap();
        numerical_force(&mut controller, &mut engine, 0, DEFAULT_SHIFT).unwrap();
        let recorder = engine.adapter();
        assert_eq!(recorder.count("push_atoms"), 1);
        assert_eq!(recorder.count("push_coordinates"), 6);
        assert_eq!(recorder.count("compute_energy"), 7);
    }
}
