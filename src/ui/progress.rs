use crate::ui::{Icons, theme};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Progress bar for bulk imports; hidden when stdout is not a terminal.
pub struct ImportProgress {
    pb: ProgressBar,
}

impl ImportProgress {
    pub fn new(total: usize) -> Self {
        let pb = if console::Term::stdout().is_term() {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template("{spinner} {bar:40} {pos}/{len} {msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { pb }
    }

    pub fn inc(&self) {
        self.pb.inc(1);
    }

    pub fn finish_with_summary(&self, duration: Duration, lines: usize, new_keys: usize) {
        self.pb.finish_and_clear();
        println!(
            "{} {}",
            Icons::CHECK,
            format!("Imported {} lines in {}", lines, HumanDuration(duration)).style(theme().success.clone())
        );
        println!("  {} {} new keys", Icons::KEY, new_keys);
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}
