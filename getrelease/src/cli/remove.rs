// getrelease/src/cli/remove.rs
use clap::Args;
use colored::Colorize;
use getrelease_common::config::Config;
use getrelease_common::error::{GrError, Result};
use getrelease_common::provider::ConfirmPrompt;
use tracing::warn;

use crate::cli::{build_installer, open_store};
use crate::ui::TermPrompt;

#[derive(Args, Debug)]
pub struct Remove {
    /// Name of the installation to remove
    pub name: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Also delete the extracted files and the cached asset
    #[arg(long)]
    pub purge: bool,
}

impl Remove {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, self.yes)?;
        let mut store = open_store(config)?;
        let Some(record) = store.get(&self.name) else {
            return Err(GrError::NotInstalled(self.name.clone()));
        };

        if !self.yes {
            let message = format!(
                "Remove {} ({}) and {} symlink(s)?",
                record.name,
                record.tag,
                record.symlinks.len()
            );
            if !TermPrompt.confirm(&message)? {
                return Err(GrError::Aborted(format!("removal of {}", self.name)));
            }
        }

        let outcome = installer.remove(&mut store, &self.name, self.purge)?;
        for (link, reason) in &outcome.link_failures {
            warn!("Left {} in place: {}", link.display(), reason);
        }
        for path in &outcome.purged {
            println!("  purged {}", path.display());
        }
        println!(
            "{} Removed {} {}",
            "✓".green(),
            outcome.record.name.green(),
            outcome.record.tag
        );
        Ok(())
    }
}
