//! `tend features` command

use anyhow::Result;

use crate::GlobalOptions;
use tend::ops::discover_flags;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let (root, member) = global_opts.target()?;

    let flags = discover_flags(&root, member.as_deref());

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "features",
            "features": flags,
        }));
        return Ok(());
    }

    for flag in &flags {
        shell.line(flag);
    }

    Ok(())
}
