use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

use autodisco_common::run::{RunStore, ScanRun};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::terminal::colors;

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

pub fn get_spinner() -> &'static ProgressBar {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    pb.set_style(style);
    pb
}

pub fn start(message: &str) {
    let pb = get_spinner();
    pb.set_message(message.color(colors::TEXT_DEFAULT).to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
}

pub fn stop() {
    get_spinner().finish_and_clear();
}

fn is_idle(pb: &ProgressBar) -> bool {
    pb.is_hidden() || pb.is_finished()
}

/// Routes log output above the spinner while it runs, straight to stdout
/// otherwise.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        let msg = msg.trim_end();
        match SPINNER.get() {
            Some(pb) if !is_idle(pb) => pb.println(msg),
            _ => writeln!(std::io::stdout(), "{msg}")?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}

/// Shows the newest line of every persisted run snapshot on the spinner.
pub struct SpinnerRunStore;

impl RunStore for SpinnerRunStore {
    fn persist(&self, run: &ScanRun) -> anyhow::Result<()> {
        if let Some(line) = run.log_lines().last() {
            get_spinner().set_message(line.color(colors::TEXT_DEFAULT).to_string());
        }
        Ok(())
    }
}
