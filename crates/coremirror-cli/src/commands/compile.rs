use super::load_scenario;
use crate::cli::CompileArgs;
use crate::config::SyncOverrides;
use crate::error::Result;
use coremirror::core::compile::table::{CompiledTables, TargetMatch};
use std::fmt::Write;
use tracing::info;

pub fn run(args: CompileArgs) -> Result<()> {
    let scenario = load_scenario(&args.config, SyncOverrides::default())?;
    let tables = CompiledTables::compile(&scenario.definitions);
    info!(
        interactions = tables.interactions.len(),
        bond_orders = tables.bond_orders.len(),
        groups = tables.group_count(),
        "Compiled {} definition(s).",
        scenario.definitions.len()
    );
    print!("{}", render(&tables));
    Ok(())
}

fn labels(targets: &TargetMatch) -> String {
    let permuted: Vec<String> = targets.permuted.iter().map(ToString::to_string).collect();
    let original: Vec<String> = targets.original.iter().map(ToString::to_string).collect();
    format!("{} by {} (from {})", permuted.join("-"), targets.kind, original.join("-"))
}

fn render(tables: &CompiledTables) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} interaction entries:", tables.interactions.len());
    for (i, entry) in tables.interactions.iter().enumerate() {
        let group = entry
            .group
            .map(|g| format!(" group {}", g.0))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {i:>4}  {:<18} {}  params {:?}  cutoff {} (soft {}){group}",
            entry.kind,
            labels(&entry.targets),
            entry.parameters,
            entry.cutoff,
            entry.soft_cutoff
        );
    }
    let _ = writeln!(out, "{} bond-order entries:", tables.bond_orders.len());
    for (i, entry) in tables.bond_orders.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {i:>4}  {:<18} {}  params {:?} per class {:?}  cutoff {} (soft {}) group {}",
            entry.kind,
            labels(&entry.targets),
            entry.parameters,
            entry.parameter_counts,
            entry.cutoff,
            entry.soft_cutoff,
            entry.group.0
        );
    }
    out
}
