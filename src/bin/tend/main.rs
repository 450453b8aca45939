//! tend CLI - reconciles Cargo manifests with the source tree

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};
use tend::core::errors::ManifestError;
use tend::core::manifest::MANIFEST_NAME;
use tend::core::target::names_equivalent;
use tend::editor::EditError;
use tend::ops::{discover_members, member_dir};
use tend::util::diagnostic::{emit, suggestions};
use tend::util::shell::Shell;
use tend::GlobalContext;

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub ctx: GlobalContext,

    /// `-p/--member` as given
    pub member: Option<String>,
}

impl GlobalOptions {
    /// Workspace root and the selected member path (`None` for the root
    /// package).
    pub fn target(&self) -> Result<(PathBuf, Option<PathBuf>)> {
        let root = self.ctx.workspace_root()?;

        let Some(wanted) = &self.member else {
            return Ok((root, self.ctx.current_member()?));
        };

        let wanted_path = Path::new(wanted.trim_end_matches('/'));
        let found = discover_members(&root).into_iter().find(|m| {
            names_equivalent(&m.name, wanted) || m.relative_path == wanted_path
        });

        match found {
            Some(member) => Ok((root, member.member_path().map(Path::to_path_buf))),
            None => bail!(
                "no workspace member named `{}` in {}\n\n{}",
                wanted,
                root.display(),
                suggestions::MEMBER_NOT_FOUND
            ),
        }
    }

    /// Manifest of the selected member.
    pub fn manifest_path(&self) -> Result<PathBuf> {
        let (root, member) = self.target()?;
        Ok(member_dir(&root, member.as_deref()).join(MANIFEST_NAME))
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("tend=debug")
        } else if cli.quiet {
            EnvFilter::new("tend=error")
        } else {
            EnvFilter::new("tend=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    );

    let ctx = match GlobalContext::new() {
        Ok(ctx) => ctx.with_manifest_path(cli.manifest_path.clone()),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    };

    let global_opts = GlobalOptions {
        shell,
        ctx,
        member: cli.member.clone(),
    };

    if let Err(e) = run(cli.command, &global_opts) {
        report_error(&e, &global_opts.shell);
        std::process::exit(1);
    }
}

fn run(command: Commands, global_opts: &GlobalOptions) -> Result<()> {
    match command {
        Commands::Members => commands::members::execute(global_opts),
        Commands::Units(args) => commands::units::execute(args, global_opts),
        Commands::Deps(args) => commands::deps::execute(args, global_opts),
        Commands::Features => commands::features::execute(global_opts),
        Commands::Check(args) => commands::check::execute(args, global_opts),
        Commands::Register(args) => commands::register::execute(args, global_opts),
        Commands::Unregister(args) => commands::unregister::execute(args, global_opts),
        Commands::Pin(args) => commands::pin::execute(args, global_opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report_error(err: &anyhow::Error, shell: &Shell) {
    if shell.is_json() {
        shell.error(format!("{:#}", err));
        return;
    }

    if let Some(edit) = err.downcast_ref::<EditError>() {
        emit(&edit.to_diagnostic(), shell.use_color());
    } else if let Some(manifest) = err.downcast_ref::<ManifestError>() {
        emit(&manifest.to_diagnostic(), shell.use_color());
    } else {
        eprintln!("error: {:#}", err);
    }
}
