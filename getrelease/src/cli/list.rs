// getrelease/src/cli/list.rs
use clap::Args;
use colored::Colorize;
use getrelease_common::config::Config;
use getrelease_common::error::Result;
use getrelease_core::ListEntry;
use prettytable::{format, Cell, Row, Table};

use crate::cli::install::tag_label;
use crate::cli::{build_installer, open_store};

#[derive(Args, Debug)]
pub struct List;

fn symlink_names(entry: &ListEntry) -> String {
    entry
        .record
        .symlink_paths()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = build_installer(config, true)?;
        let store = open_store(config)?;
        let entries = installer.list(&store);
        if entries.is_empty() {
            println!("{}", "0 releases installed".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Repo").style_spec("b"),
            Cell::new("Tag").style_spec("b"),
            Cell::new("Installed").style_spec("b"),
            Cell::new("Symlinks").style_spec("b"),
            Cell::new("Status").style_spec("b"),
        ]));
        let mut broken = 0;
        for entry in &entries {
            let record = &entry.record;
            let status = if entry.is_healthy() {
                Cell::new("ok").style_spec("Fg")
            } else {
                broken += 1;
                Cell::new("broken").style_spec("Fr")
            };
            table.add_row(Row::new(vec![
                Cell::new(&record.name).style_spec("Fb"),
                Cell::new(record.repo.as_deref().unwrap_or("(url)")),
                Cell::new(tag_label(&record.tag)),
                Cell::new(&record.installed_at.format("%Y-%m-%d").to_string()),
                Cell::new(&symlink_names(entry)),
                status,
            ]));
        }
        table.printstd();
        println!("{}", format!("{} installed", entries.len()).bold());
        if broken > 0 {
            println!(
                "{}",
                format!("{broken} broken; reinstall or remove them").yellow()
            );
        }
        Ok(())
    }
}
