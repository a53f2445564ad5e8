pub mod compile;
pub mod kinds;
pub mod trace;

use crate::config::{PartialScenario, Scenario, SyncOverrides};
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Reads a scenario file and resolves it against the command-line overrides.
pub(crate) fn load_scenario(path: &Path, overrides: SyncOverrides) -> Result<Scenario> {
    info!("Loading scenario from {:?}", path);
    let partial = PartialScenario::from_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    partial.merge_with_cli(overrides, base_dir)
}
