// getrelease/src/ui.rs
//! Terminal implementations of the installer's prompt and progress hooks.
use std::io::IsTerminal;
use std::sync::Mutex;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use getrelease_common::error::{GrError, Result};
use getrelease_common::provider::{ConfirmPrompt, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg:.bold} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.blue.bold} {msg:.bold} {bytes} ({bytes_per_sec})";

/// Yes/no prompt on the terminal. Refuses to guess when stdin is not a tty.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermPrompt;

impl ConfirmPrompt for TermPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            return Err(GrError::Aborted(format!(
                "{message} (no terminal to confirm on; pass -y)"
            )));
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(true)
            .interact()
            .map_err(|e| GrError::Generic(format!("prompt failed: {e}")))
    }
}

/// Byte progress for one download at a time.
#[derive(Debug, Default)]
pub struct DownloadBar {
    bar: Mutex<Option<ProgressBar>>,
}

impl DownloadBar {
    fn style(total: Option<u64>) -> ProgressStyle {
        match total {
            Some(_) => ProgressStyle::with_template(BAR_TEMPLATE)
                .map(|s| s.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            None => ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }
}

impl ProgressReporter for DownloadBar {
    fn on_start(&self, name: &str, total: Option<u64>) {
        let pb = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(Self::style(total));
        pb.set_message(name.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_progress(&self, done: u64, _total: Option<u64>) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(done);
            }
        }
    }

    fn on_finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}
