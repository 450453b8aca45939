//! `tend unregister` command

use anyhow::Result;

use crate::cli::UnregisterArgs;
use crate::GlobalOptions;
use tend::ops::unregister_unit;
use tend::util::shell::Status;

pub fn execute(args: UnregisterArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let manifest_path = global_opts.manifest_path()?;

    let result = unregister_unit(&manifest_path, args.kind, &args.name, args.dry_run)?;

    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "unregistered",
            "kind": args.kind,
            "name": args.name,
            "changed": result.changed,
            "written": result.written,
        }));
        return Ok(());
    }

    let unit = format!("{} `{}`", args.kind, args.name);
    if !result.changed {
        shell.status(
            Status::Warning,
            format!("{} is not declared in {}", unit, manifest_path.display()),
        );
    } else if args.dry_run {
        shell.status(Status::Info, format!("would remove {}", unit));
        shell.line(&result.text);
    } else {
        shell.status(Status::Removed, unit);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tend::TargetKind;

    fn parse_unregister_args(args: &[&str]) -> UnregisterArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            unregister: UnregisterArgs,
        }
        TestCli::parse_from(args).unregister
    }

    #[test]
    fn test_unregister_args() {
        let args = parse_unregister_args(&["test", "test", "smoke", "--dry-run"]);
        assert_eq!(args.kind, TargetKind::Test);
        assert_eq!(args.name, "smoke");
        assert!(args.dry_run);
    }

    #[test]
    fn test_unregister_accepts_long_kind_names() {
        let args = parse_unregister_args(&["test", "executable", "tool"]);
        assert_eq!(args.kind, TargetKind::Bin);
    }
}
