// getrelease/src/cli/install.rs
use clap::Args;
use colored::Colorize;
use getrelease_common::config::Config;
use getrelease_common::error::Result;
use getrelease_common::model::InstallationRecord;
use getrelease_core::{InstallOutcome, InstallRequest};

use crate::cli::{build_installer, open_store};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Repository as owner/repo or a GitHub/GitLab URL
    #[arg(required_unless_present = "url")]
    pub repo_id: Option<String>,

    /// Release tag; "latest" or "pre" for the newest pre-release
    #[arg(short, long, default_value = "latest")]
    pub tag: String,

    /// Install this asset URL directly, skipping release lookup
    #[arg(short, long)]
    pub url: Option<String>,

    /// Do not ask for confirmation
    #[arg(short = 'y', long = "confirm", visible_alias = "yes")]
    pub confirm: bool,

    /// Only download the asset into the cache
    #[arg(short, long)]
    pub download_only: bool,

    /// Regex that picks the release asset instead of platform detection
    #[arg(long, value_name = "REGEX")]
    pub asset_pattern: Option<String>,

    /// Regex that limits which executables get linked
    #[arg(long, value_name = "REGEX")]
    pub bin_pattern: Option<String>,

    /// Link name for the binary; also the name of the installation
    #[arg(long, value_name = "NAME")]
    pub symlink_alias: Option<String>,
}

impl InstallArgs {
    pub fn request(&self) -> InstallRequest {
        InstallRequest {
            repo_id: self.repo_id.clone(),
            tag: self.tag.clone(),
            url: self.url.clone(),
            confirm: self.confirm,
            download_only: self.download_only,
            asset_pattern: self.asset_pattern.clone(),
            bin_pattern: self.bin_pattern.clone(),
            symlink_alias: self.symlink_alias.clone(),
        }
    }

    pub async fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, self.confirm)?;
        let mut store = open_store(config)?;

        match installer.install(&mut store, &self.request()).await? {
            InstallOutcome::Installed(record) => print_installed(&record),
            InstallOutcome::Downloaded { path, tag } => println!(
                "{} Downloaded {} ({}) to {}",
                "✓".green(),
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
                    .cyan(),
                tag_label(&tag),
                path.display()
            ),
        }
        Ok(())
    }
}

/// URL installs carry no release tag.
pub(crate) fn tag_label(tag: &str) -> &str {
    if tag.is_empty() {
        "-"
    } else {
        tag
    }
}

pub(crate) fn print_installed(record: &InstallationRecord) {
    println!(
        "{} Installed {} {}",
        "✓".green(),
        record.name.green().bold(),
        tag_label(&record.tag)
    );
    for (binary, link) in &record.symlinks {
        println!("  {} -> {}", link.display(), binary.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_installs_show_a_placeholder_tag() {
        assert_eq!(tag_label(""), "-");
        assert_eq!(tag_label("v1.2.0"), "v1.2.0");
    }
}
