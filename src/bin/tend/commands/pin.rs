//! `tend pin` command

use anyhow::Result;

use crate::cli::PinArgs;
use crate::GlobalOptions;
use tend::ops::{pin_dependency, PinOptions};
use tend::util::shell::Status;

pub fn execute(args: PinArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let manifest_path = global_opts.manifest_path()?;

    let opts = PinOptions {
        kind: args.kind,
        name: args.name.clone(),
        version: args.version.clone(),
        dry_run: args.dry_run,
    };

    let result = pin_dependency(&manifest_path, &opts)?;

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "pinned",
            "kind": args.kind.to_string(),
            "name": args.name,
            "version": args.version,
            "changed": result.changed,
            "written": result.written,
        }));
        return Ok(());
    }

    if !result.changed {
        shell.status(
            Status::Skipped,
            format!("`{}` already requires {}", args.name, args.version),
        );
    } else if args.dry_run {
        shell.status(
            Status::Info,
            format!("would pin `{}` to {}", args.name, args.version),
        );
        shell.line(&result.text);
    } else {
        shell.status(Status::Pinned, format!("{} {}", args.name, args.version));
    }

    Ok(())
}
