// getrelease/src/cli/config.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use getrelease_common::config::{Config, ConfigFile};
use getrelease_common::error::Result;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Directory the symlinks are created in
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Directory downloaded assets are cached in
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory assets are extracted into
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,

    #[arg(long, value_name = "TOKEN")]
    pub gitlab_token: Option<String>,
}

impl ConfigArgs {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            bin_dir: self.bin_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            data_dir: self.data_dir.clone(),
            github_token: self.github_token.clone(),
            gitlab_token: self.gitlab_token.clone(),
        }
    }

    pub fn run(&self, config: &Config) -> Result<()> {
        let overrides = self.overrides();
        let mut effective = config.clone();
        if overrides != ConfigFile::default() {
            config.save_file(&overrides)?;
            effective.apply_file(overrides);
            println!(
                "{} Wrote {}",
                "✓".green(),
                config.config_file_path().display()
            );
        }

        let token = |t: &Option<String>| if t.is_some() { "set" } else { "not set" };
        println!("{:<14}{}", "bin_dir".bold(), effective.bin_dir.display());
        println!("{:<14}{}", "cache_dir".bold(), effective.cache_dir.display());
        println!("{:<14}{}", "data_dir".bold(), effective.data_dir.display());
        println!("{:<14}{}", "state_dir".bold(), effective.state_dir.display());
        println!("{:<14}{}", "github_token".bold(), token(&effective.github_token));
        println!("{:<14}{}", "gitlab_token".bold(), token(&effective.gitlab_token));
        Ok(())
    }
}
