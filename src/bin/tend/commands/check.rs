//! `tend check` command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use crate::GlobalOptions;
use tend::core::convention::unit_name_for_path;
use tend::core::manifest::MANIFEST_NAME;
use tend::editor::Declaration;
use tend::ops::drift::DriftReport;
use tend::ops::{
    check, declare_feature, discover_members, member_dir, register_units, DriftOptions,
    RegisterOptions, RegisterResult,
};
use tend::util::diagnostic::suggestions;
use tend::util::shell::{Shell, Status};
use tend::TargetKind;

pub fn execute(args: CheckArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let (root, member) = global_opts.target()?;
    let opts = DriftOptions::from_config(&global_opts.ctx.config());

    let members: Vec<Option<PathBuf>> = if args.workspace {
        discover_members(&root)
            .iter()
            .map(|m| m.member_path().map(Path::to_path_buf))
            .collect()
    } else {
        vec![member]
    };

    let mut outstanding = 0;
    for member in &members {
        let label = member_label(member.as_deref());
        shell.status(Status::Checking, &label);

        let report = check(&root, member.as_deref(), &opts);
        print_report(shell, &label, &report);

        if report.is_clean() {
            continue;
        }
        if args.fix {
            fix(shell, &root, member.as_deref(), &report, args.dry_run)?;
        } else {
            outstanding += report.len();
        }
    }

    if outstanding > 0 {
        bail!(
            "found {} drift finding{}\n\n{}",
            outstanding,
            if outstanding == 1 { "" } else { "s" },
            suggestions::DRIFT_FOUND
        );
    }

    shell.status(
        Status::Finished,
        format!(
            "checked {} member{}",
            members.len(),
            if members.len() == 1 { "" } else { "s" }
        ),
    );
    Ok(())
}

fn member_label(member: Option<&Path>) -> String {
    match member {
        Some(path) => path.display().to_string(),
        None => ".".to_string(),
    }
}

fn print_report(shell: &Shell, label: &str, report: &DriftReport) {
    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "drift",
            "member": label,
            "clean": report.is_clean(),
            "unregistered": report.unregistered,
            "undeclared_flags": report.undeclared_flags,
            "location_mismatches": report.location_mismatches,
        }));
        return;
    }

    for item in &report.unregistered {
        match item.kind {
            Some(kind) => shell.line(format!(
                "unregistered {} `{}` at {}",
                kind.description(),
                item.name,
                item.path.display()
            )),
            None => shell.line(format!("unregistered file {}", item.path.display())),
        }
    }
    for flag in &report.undeclared_flags {
        shell.line(format!("undeclared feature `{}`", flag));
    }
    for mismatch in &report.location_mismatches {
        shell.line(format!(
            "{} `{}` at {} sits in the {} directory",
            mismatch.kind.description(),
            mismatch.name,
            mismatch.path.display(),
            mismatch.found_in
        ));
    }
}

/// Register files shaped like units and declare undeclared flags.
/// Location mismatches and stray module files are only reported.
fn fix(
    shell: &Shell,
    root: &Path,
    member: Option<&Path>,
    report: &DriftReport,
    dry_run: bool,
) -> Result<()> {
    let manifest_path = member_dir(root, member).join(MANIFEST_NAME);

    let mut declarations = Vec::new();
    for item in &report.unregistered {
        match item.kind {
            Some(kind) if kind != TargetKind::Lib && unit_name_for_path(kind, &item.path).is_some() => {
                declarations
                    .push(Declaration::new(kind, item.name.clone()).with_path(item.path.clone()));
            }
            _ => shell.warn(format!(
                "{} is not reachable from any unit; add a `mod` declaration or list it in `drift.ignore`",
                item.path.display()
            )),
        }
    }

    if !declarations.is_empty() {
        let opts = RegisterOptions {
            declarations: declarations.clone(),
            dry_run,
        };
        if let RegisterResult::Registered(result) = register_units(&manifest_path, &opts)? {
            for declaration in &declarations {
                let unit = format!("{} `{}`", declaration.kind, declaration.name);
                if result.written {
                    shell.status(Status::Registered, unit);
                } else {
                    shell.status(Status::Info, format!("would register {}", unit));
                }
            }
        }
    }

    for flag in &report.undeclared_flags {
        let result = declare_feature(&manifest_path, flag, dry_run)?;
        if result.written {
            shell.status(Status::Declared, format!("feature `{}`", flag));
        } else if result.changed {
            shell.status(Status::Info, format!("would declare feature `{}`", flag));
        }
    }

    for mismatch in &report.location_mismatches {
        shell.warn(format!(
            "`{}` is declared as a {} but lives in the {} directory; move it by hand",
            mismatch.name,
            mismatch.kind.description(),
            mismatch.found_in
        ));
    }

    Ok(())
}
