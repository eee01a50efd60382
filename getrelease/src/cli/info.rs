// getrelease/src/cli/info.rs
use clap::Args;
use getrelease_common::config::Config;
use getrelease_common::error::Result;
use prettytable::{format, Cell, Row, Table};

use crate::cli::build_installer;

#[derive(Args, Debug)]
pub struct Info {
    /// Repository as owner/repo or a GitHub/GitLab URL
    pub repo_id: String,
}

impl Info {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, true)?;
        let info = installer.info(&self.repo_id).await?;

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        for (key, value) in info.rows() {
            table.add_row(Row::new(vec![
                Cell::new(key).style_spec("b"),
                Cell::new(&value),
            ]));
        }
        table.printstd();
        Ok(())
    }
}
