use super::load_scenario;
use crate::cli::TraceArgs;
use crate::config::{Request, RequestedQuantity, Scenario, SyncOverrides};
use crate::error::Result;
use coremirror::engine::controller::SyncController;
use coremirror::engine::error::SyncError;
use coremirror::engine::handle::EngineHandle;
use coremirror::engine::recording::{EngineCall, RecordingEngine};
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, info, warn};

/// What one request cost in engine calls.
#[derive(Debug)]
pub struct RequestTrace {
    pub client: String,
    pub quantity: RequestedQuantity,
    pub outcome: std::result::Result<String, SyncError>,
    pub calls: Vec<EngineCall>,
}

impl RequestTrace {
    pub fn full_initialization(&self) -> bool {
        self.calls
            .iter()
            .any(|call| matches!(call, EngineCall::PushAtoms(_)))
    }

    pub fn pushes(&self) -> usize {
        self.calls.iter().filter(|call| call.is_push()).count()
    }

    pub fn pulls(&self) -> usize {
        self.calls.iter().filter(|call| call.is_pull()).count()
    }
}

pub fn run(args: TraceArgs) -> Result<()> {
    let scenario = load_scenario(&args.config, SyncOverrides::from(&args))?;
    info!(
        requests = scenario.requests.len(),
        atoms = scenario.structure.len(),
        "Replaying scenario against a recording engine."
    );

    let traces = replay(&scenario)?;
    for (i, trace) in traces.iter().enumerate() {
        print!("{}", render(i + 1, trace));
    }

    let failed = traces.iter().filter(|t| t.outcome.is_err()).count();
    let pulls: usize = traces.iter().map(RequestTrace::pulls).sum();
    println!(
        "{} request(s), {} engine evaluation(s), {} failed.",
        traces.len(),
        pulls,
        failed
    );
    Ok(())
}

/// Runs every request through one controller per client, all sharing a single engine.
///
/// A request that fails is recorded and the replay continues; only scenario
/// edits that do not fit the structure abort it.
pub fn replay(scenario: &Scenario) -> Result<Vec<RequestTrace>> {
    let mut engine = EngineHandle::new(RecordingEngine::new());
    let mut clients: BTreeMap<String, SyncController> = BTreeMap::new();
    let mut traces = Vec::with_capacity(scenario.requests.len());

    for request in &scenario.requests {
        let controller = clients.entry(request.client.clone()).or_insert_with(|| {
            debug!(client = %request.client, "Creating client.");
            let mut controller = SyncController::new(scenario.sync.clone());
            controller.set_structure(scenario.structure.clone());
            controller.set_definitions(scenario.definitions.clone());
            controller
        });

        apply_edits(controller, request)?;
        let outcome = evaluate(controller, &mut engine, request);
        if let Err(e) = &outcome {
            warn!(client = %request.client, "Request failed: {}", e);
            if matches!(e, SyncError::ResourceConflict { .. }) {
                controller.release_claim();
            }
        }

        traces.push(RequestTrace {
            client: request.client.clone(),
            quantity: request.quantity,
            outcome,
            calls: engine.adapter_mut().take_calls(),
        });
    }
    Ok(traces)
}

fn apply_edits(controller: &mut SyncController, request: &Request) -> Result<()> {
    if request.set_momentum.is_none() && request.translate.is_none() && request.set_charge.is_none() {
        return Ok(());
    }
    let mut structure = controller
        .structure()
        .cloned()
        .ok_or(SyncError::MissingStructure)?;
    request.apply(&mut structure).map_err(SyncError::from)?;
    controller.set_structure(structure);
    Ok(())
}

fn evaluate(
    controller: &mut SyncController,
    engine: &mut EngineHandle<RecordingEngine>,
    request: &Request,
) -> std::result::Result<String, SyncError> {
    Ok(match request.quantity {
        RequestedQuantity::Energy => format!("{:.6}", controller.energy(engine)?),
        RequestedQuantity::Forces => vectors(&controller.forces(engine)?),
        RequestedQuantity::Stress => format!("{:?}", controller.stress(engine)?),
        RequestedQuantity::Electronegativities => {
            format!("{:?}", controller.electronegativities(engine)?)
        }
        RequestedQuantity::BondOrderFactors => {
            let definition = request.definition.ok_or_else(|| {
                SyncError::Internal("bond-order request without a definition".to_string())
            })?;
            format!("{:?}", controller.bond_order_factors(engine, definition)?)
        }
    })
}

fn vectors(values: &[Vector3<f64>]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("({:.6}, {:.6}, {:.6})", v.x, v.y, v.z))
        .collect();
    format!("[{}]", items.join(", "))
}

fn render(number: usize, trace: &RequestTrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{number} [{}] {:?}", trace.client, trace.quantity);
    match &trace.outcome {
        Ok(value) => {
            let _ = writeln!(out, "  value: {value}");
        }
        Err(e) => {
            let _ = writeln!(out, "  failed: {e}");
        }
    }
    let init = if trace.full_initialization() {
        ", full initialization"
    } else {
        ""
    };
    let _ = writeln!(
        out,
        "  {} push(es), {} pull(s){init}",
        trace.pushes(),
        trace.pulls()
    );
    for call in &trace.calls {
        let _ = writeln!(out, "    {call}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialScenario;
    use std::fs;
    use tempfile::tempdir;

    fn scenario(requests: &str) -> Scenario {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        let content = format!(
            r#"
            [structure]
            [[structure.atoms]]
            symbol = "H"
            position = [0.0, 0.0, 0.0]

            [[structure.atoms]]
            symbol = "H"
            position = [0.74, 0.0, 0.0]

            [[potentials]]
            kind = "LJ"
            symbols = ["H", "H"]
            parameters = [0.1, 2.5]
            cutoff = 4.0

            {requests}
            "#
        );
        fs::write(&path, content).unwrap();
        PartialScenario::from_file(&path)
            .unwrap()
            .merge_with_cli(SyncOverrides::default(), dir.path())
            .unwrap()
    }

    #[test]
    fn repeated_requests_are_answered_from_the_cache() {
        let traces = replay(&scenario(
            r#"
            [[requests]]
            quantity = "energy"
            [[requests]]
            quantity = "energy"
            "#,
        ))
        .unwrap();

        assert!(traces[0].full_initialization());
        assert_eq!(traces[0].pulls(), 1);
        assert!(traces[1].calls.is_empty());
    }

    #[test]
    fn a_moved_atom_costs_one_coordinate_push() {
        let traces = replay(&scenario(
            r#"
            [[requests]]
            quantity = "forces"
            [[requests]]
            quantity = "forces"
            translate = { atom = 1, value = [0.01, 0.0, 0.0] }
            "#,
        ))
        .unwrap();

        let second = &traces[1];
        assert!(!second.full_initialization());
        assert_eq!(second.pulls(), 1);
        assert!(second.calls.contains(&EngineCall::PushCoordinates));
        assert!(second.outcome.as_ref().unwrap().starts_with("[(0.000000"));
    }

    #[test]
    fn a_second_client_adopts_the_engine_without_reinitializing() {
        let traces = replay(&scenario(
            r#"
            [[requests]]
            quantity = "energy"
            [[requests]]
            client = "other"
            quantity = "energy"
            "#,
        ))
        .unwrap();

        assert!(!traces[1].full_initialization());
        assert_eq!(traces[1].pulls(), 1);
    }

    #[test]
    fn failed_requests_are_recorded_and_the_replay_continues() {
        let traces = replay(&scenario(
            r#"
            [[requests]]
            quantity = "bond-order-factors"
            definition = 0
            [[requests]]
            quantity = "stress"
            "#,
        ))
        .unwrap();

        assert!(matches!(
            traces[0].outcome,
            Err(SyncError::UnknownGroup { index: 0 })
        ));
        assert!(traces[1].outcome.is_ok());
        assert!(render(1, &traces[0]).contains("failed:"));
    }

    #[test]
    fn edits_outside_the_structure_abort_the_replay() {
        let result = replay(&scenario(
            r#"
            [[requests]]
            quantity = "energy"
            set-charge = { atom = 7, value = 0.5 }
            "#,
        ));
        assert!(result.is_err());
    }
}
