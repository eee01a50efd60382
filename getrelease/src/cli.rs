// getrelease/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use getrelease_common::config::Config;
use getrelease_common::error::Result;
use getrelease_common::provider::AlwaysConfirm;
use getrelease_core::{InstallStore, Installer};
use getrelease_net::{ForgeClient, HttpFetcher};

pub mod config;
pub mod info;
pub mod install;
pub mod list;
pub mod remove;
pub mod update;

use crate::cli::config::ConfigArgs;
use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::remove::Remove;
use crate::cli::update::{UpdateAllArgs, UpdateArgs};
use crate::ui::{DownloadBar, TermPrompt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "getrelease", bin_name = "getrelease")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Install(InstallArgs),
    #[command(visible_alias = "upgrade")]
    Update(UpdateArgs),
    #[command(visible_alias = "upgrade-all")]
    UpdateAll(UpdateAllArgs),
    #[command(visible_aliases = ["uninstall", "rm"])]
    Remove(Remove),
    #[command(visible_alias = "ls")]
    List(List),
    Info(Info),
    Config(ConfigArgs),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Update(command) => command.run(config).await,
            Self::UpdateAll(command) => command.run(config).await,
            Self::Remove(command) => command.run(config),
            Self::List(command) => command.run(config),
            Self::Info(command) => command.run(config).await,
            Self::Config(command) => command.run(config),
        }
    }
}

pub type CliInstaller = Installer<ForgeClient, HttpFetcher>;

/// Installer wired to the real forges, the terminal prompt (unless
/// `assume_yes`) and a download progress bar.
pub fn build_installer(config: &Config, assume_yes: bool) -> Result<CliInstaller> {
    let installer = Installer::new(config.clone(), ForgeClient::new(config)?, HttpFetcher::new()?)
        .with_progress(DownloadBar::default());
    Ok(if assume_yes {
        installer.with_prompt(AlwaysConfirm)
    } else {
        installer.with_prompt(TermPrompt)
    })
}

pub fn open_store(config: &Config) -> Result<InstallStore> {
    InstallStore::open(&config.store_path())
}
