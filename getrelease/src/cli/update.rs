// getrelease/src/cli/update.rs
use clap::Args;
use colored::Colorize;
use getrelease_common::config::Config;
use getrelease_common::error::{GrError, Result};
use getrelease_core::UpdateOutcome;
use tracing::debug;

use crate::cli::{build_installer, open_store};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Name of the installation to update
    pub name: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct UpdateAllArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

fn print_outcome(name: &str, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::Skipped { reason } => {
            println!("{} {} skipped: {}", "-".dimmed(), name.cyan(), reason)
        }
        UpdateOutcome::UpToDate { tag } => {
            println!("{} {} is up to date ({})", "✓".green(), name.cyan(), tag)
        }
        UpdateOutcome::Updated { from, record } => println!(
            "{} Updated {} {} -> {}",
            "✓".green(),
            name.green().bold(),
            from,
            record.tag
        ),
    }
}

impl UpdateArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, self.yes)?;
        let mut store = open_store(config)?;
        let outcome = installer.update(&mut store, &self.name).await?;
        print_outcome(&self.name, &outcome);
        Ok(())
    }
}

impl UpdateAllArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, self.yes)?;
        let mut store = open_store(config)?;
        if store.is_empty() {
            println!("{}", "Nothing installed".yellow());
            return Ok(());
        }

        let report = installer.update_all(&mut store).await;
        for (name, result) in &report.results {
            match result {
                Ok(outcome) => print_outcome(name, outcome),
                Err(e) => eprintln!("{} {}: {}", "✖".red(), name.cyan(), e),
            }
        }

        let failed: Vec<&str> = report.failures().map(|(name, _)| name).collect();
        debug!("update-all finished with {} failure(s)", failed.len());
        if failed.is_empty() {
            Ok(())
        } else {
            Err(GrError::Generic(format!(
                "{} of {} update(s) failed: {}",
                failed.len(),
                report.results.len(),
                failed.join(", ")
            )))
        }
    }
}
