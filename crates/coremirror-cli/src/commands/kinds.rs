use crate::cli::KindsArgs;
use crate::error::{CliError, Result};
use coremirror::core::interactions::registry::KindRegistry;
use std::fmt::Write;
use tracing::info;

pub fn run(args: KindsArgs) -> Result<()> {
    let mut registry = KindRegistry::builtin();
    if let Some(path) = &args.registry {
        info!("Merging kinds from {:?}", path);
        registry.extend_from_file(path)?;
    }
    print!("{}", render(&registry, args.name.as_deref())?);
    Ok(())
}

fn render(registry: &KindRegistry, name: Option<&str>) -> Result<String> {
    if let Some(name) = name {
        return registry
            .describe(name)
            .ok_or_else(|| CliError::Argument(format!("Unknown interaction kind '{name}'.")));
    }

    let mut out = String::new();
    let _ = writeln!(out, "Potentials:");
    for name in registry.potential_names() {
        let n_targets = registry.n_targets(name).unwrap_or_default();
        let parameters = registry.parameter_names(name).unwrap_or_default();
        let _ = writeln!(out, "  {name:<20} {n_targets}-body  [{}]", parameters.join(", "));
    }
    let _ = writeln!(out, "Bond-order factors:");
    for name in registry.bond_order_names() {
        let n_targets = registry.n_targets(name).unwrap_or_default();
        let counts = registry.bond_order_parameter_counts(name).unwrap_or_default();
        let _ = writeln!(out, "  {name:<20} {n_targets}-body  parameters per class {counts:?}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_shows_both_families() {
        let out = render(&KindRegistry::builtin(), None).unwrap();
        let bond_orders_at = out.find("Bond-order factors:").unwrap();
        let lj_at = out.find("LJ").unwrap();
        let tersoff_at = out.find("tersoff").unwrap();
        assert!(lj_at < bond_orders_at);
        assert!(tersoff_at > bond_orders_at);
        assert!(out.contains("[epsilon, sigma]"));
        assert!(out.contains("[2, 0, 5]"));
    }

    #[test]
    fn naming_a_kind_describes_it() {
        let out = render(&KindRegistry::builtin(), Some("spring")).unwrap();
        assert!(out.starts_with("potential 'spring'"));
        assert!(out.contains("R_0"));
    }

    #[test]
    fn unknown_names_are_argument_errors() {
        let result = render(&KindRegistry::builtin(), Some("morse"));
        assert!(matches!(result, Err(CliError::Argument(_))));
    }
}
