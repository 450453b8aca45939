//! `tend completions` command
//!
//! Generates shell completions for various shells.

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(args.shell, &mut cmd, name, &mut io::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_completions_shell_parsing() {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            completions: CompletionsArgs,
        }

        let cli = TestCli::parse_from(["test", "bash"]);
        assert_eq!(cli.completions.shell, clap_complete::Shell::Bash);
        assert!(TestCli::try_parse_from(["test", "cmd.exe"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
