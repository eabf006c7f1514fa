use anyhow::{Context, Result};
use clap::Args;
use promptdiff::{InstallOutcome, PathResolver, hook_command, install_hook};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Executable the hook should run (defaults to this binary)
    #[arg(long, value_name = "PATH")]
    exe: Option<PathBuf>,
}

pub fn run(resolver: &PathResolver, args: InstallArgs) -> Result<()> {
    let settings_path = resolver.settings_file()?;
    let exe = match args.exe {
        Some(exe) => exe,
        None => std::env::current_exe().context("failed to locate the promptdiff binary")?,
    };
    let command = hook_command(&exe);

    println!("Settings file: {}", settings_path.display());
    println!("Hook command:  {}", command);
    println!();

    match install_hook(&settings_path, &command)
        .with_context(|| format!("failed to update {}", settings_path.display()))?
    {
        InstallOutcome::Installed { .. } => {
            println!("Hook added.");
            println!("Restart Claude Code for the hook to take effect.");
        }
        InstallOutcome::AlreadyConfigured => {
            println!("Hook already configured, nothing to do.");
        }
    }
    Ok(())
}
