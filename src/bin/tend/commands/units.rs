//! `tend units` command

use anyhow::Result;

use crate::cli::UnitsArgs;
use crate::GlobalOptions;
use tend::core::target::TargetOrigin;
use tend::ops::discover_units;

pub fn execute(args: UnitsArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let (root, member) = global_opts.target()?;

    let units: Vec<_> = discover_units(&root, member.as_deref())
        .into_iter()
        .filter(|u| args.kind.map_or(true, |k| u.kind == k))
        .collect();

    if shell.is_json() {
        for unit in &units {
            shell.json_event(&serde_json::json!({
                "reason": "unit",
                "name": unit.name,
                "kind": unit.kind,
                "path": unit.path,
                "origin": unit.origin,
                "required_features": unit.required_features,
            }));
        }
        return Ok(());
    }

    for unit in &units {
        let mut line = format!("{:<8} {} ({})", unit.kind, unit.name, unit.path.display());
        match unit.origin {
            TargetOrigin::Declared => {}
            TargetOrigin::Implicit => line.push_str(" [implicit]"),
            TargetOrigin::Discovered => line.push_str(" [discovered]"),
        }
        if !unit.required_features.is_empty() {
            line.push_str(&format!(" requires {}", unit.required_features.join(", ")));
        }
        shell.line(line);
    }

    Ok(())
}
