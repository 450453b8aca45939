//! `tend members` command

use anyhow::Result;

use crate::GlobalOptions;
use tend::ops::discover_members;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let root = global_opts.ctx.workspace_root()?;

    let members = discover_members(&root);

    if shell.is_json() {
        for member in &members {
            shell.json_event(&serde_json::json!({
                "reason": "member",
                "name": member.name,
                "path": member.relative_path,
                "root": member.is_root,
            }));
        }
        return Ok(());
    }

    if members.is_empty() {
        shell.note(format!("no members found under {}", root.display()));
        return Ok(());
    }

    for member in &members {
        let marker = if member.is_root { " (root)" } else { "" };
        shell.line(format!(
            "{} {}{}",
            member.name,
            member.relative_path.display(),
            marker
        ));
    }

    Ok(())
}
