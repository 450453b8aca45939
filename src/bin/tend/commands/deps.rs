//! `tend deps` command

use anyhow::Result;

use crate::cli::DepsArgs;
use crate::GlobalOptions;
use tend::ops::discover_dependencies;
use tend::Dependency;

pub fn execute(args: DepsArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let (root, member) = global_opts.target()?;

    let set = discover_dependencies(&root, member.as_deref());
    let deps: Vec<&Dependency> = set
        .iter()
        .filter(|d| args.kind.map_or(true, |k| d.kind == k))
        .collect();

    if shell.is_json() {
        for dep in &deps {
            shell.json_event(&serde_json::json!({
                "reason": "dependency",
                "name": dep.name,
                "kind": dep.kind.to_string(),
                "version": dep.version,
                "optional": dep.optional,
                "features": dep.features,
            }));
        }
        return Ok(());
    }

    for dep in &deps {
        shell.line(describe(dep));
    }

    Ok(())
}

fn describe(dep: &Dependency) -> String {
    let mut line = format!("{:<9} {}", dep.kind, dep.name);
    if let Some(version) = &dep.version {
        line.push_str(&format!(" {}", version));
    } else if let Some(path) = &dep.path {
        line.push_str(&format!(" (path: {})", path.display()));
    } else if let Some(git) = &dep.git {
        line.push_str(&format!(" (git: {})", git));
    } else if dep.workspace {
        line.push_str(" (workspace)");
    }
    if dep.optional {
        line.push_str(" [optional]");
    }
    line
}
