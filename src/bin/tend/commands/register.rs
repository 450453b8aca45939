//! `tend register` command

use anyhow::Result;

use crate::cli::RegisterArgs;
use crate::GlobalOptions;
use tend::editor::Declaration;
use tend::ops::{register_unit, RegisterResult};
use tend::util::shell::Status;

pub fn execute(args: RegisterArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let manifest_path = global_opts.manifest_path()?;

    let mut declaration = Declaration::new(args.kind, args.name.clone())
        .with_required_features(args.required_features.clone());
    if let Some(path) = &args.path {
        declaration = declaration.with_path(path.clone());
    }

    match register_unit(&manifest_path, &declaration, args.dry_run)? {
        RegisterResult::Registered(result) => {
            if shell.is_json() {
                shell.json_event(&serde_json::json!({
                    "reason": "registered",
                    "kind": args.kind,
                    "name": args.name,
                    "written": result.written,
                }));
            } else if args.dry_run {
                shell.status(
                    Status::Info,
                    format!("would register {} `{}`", args.kind, args.name),
                );
                shell.line(&result.text);
            } else {
                shell.status(Status::Registered, format!("{} `{}`", args.kind, args.name));
            }
        }
        RegisterResult::AlreadyDeclared => {
            shell.status(
                Status::Skipped,
                format!(
                    "{} `{}` is already declared in {}",
                    args.kind,
                    args.name,
                    manifest_path.display()
                ),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tend::TargetKind;

    fn parse_register_args(args: &[&str]) -> RegisterArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            register: RegisterArgs,
        }
        TestCli::parse_from(args).register
    }

    #[test]
    fn test_register_args_defaults() {
        let args = parse_register_args(&["test", "bin", "tool"]);

        assert_eq!(args.kind, TargetKind::Bin);
        assert_eq!(args.name, "tool");
        assert_eq!(args.path, None);
        assert!(args.required_features.is_empty());
        assert!(!args.dry_run);
    }

    #[test]
    fn test_register_with_path_and_features() {
        let args = parse_register_args(&[
            "test",
            "example",
            "demo",
            "--path",
            "examples/demo/main.rs",
            "--required-features",
            "cli,net",
            "--dry-run",
        ]);

        assert_eq!(args.kind, TargetKind::Example);
        assert_eq!(args.path, Some(PathBuf::from("examples/demo/main.rs")));
        assert_eq!(args.required_features, vec!["cli", "net"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_register_rejects_unknown_kind() {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            register: RegisterArgs,
        }
        assert!(TestCli::try_parse_from(["test", "plugin", "x"]).is_err());
    }
}
