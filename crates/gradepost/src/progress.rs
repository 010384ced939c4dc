//! Console progress for the send loop.

use gradepost_core::Progress;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

const TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} {wide_msg}";

/// Progress bar fed by [`Progress`] events.
///
/// The bar stays hidden until the loop starts, so nothing is drawn for dry
/// runs or early failures.
pub struct Reporter {
    bar: ProgressBar,
}

impl Reporter {
    pub fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::hidden();
        bar.set_style(ProgressStyle::with_template(TEMPLATE)?.progress_chars("=> "));
        Ok(Self { bar })
    }

    /// Log writer that lifts the bar while a line is printed.
    pub fn log_writer(&self) -> BarWriter {
        BarWriter {
            bar: self.bar.clone(),
        }
    }

    pub fn handle(&self, event: Progress<'_>) {
        match event {
            Progress::Started { total } => {
                self.bar.set_length(u64::try_from(total).unwrap_or(u64::MAX));
                self.bar.set_draw_target(ProgressDrawTarget::stderr());
            }
            Progress::Sent { record, .. } => {
                self.bar.set_message(record.folder_name());
                self.bar.inc(1);
            }
            Progress::Failed { record, error } => {
                self.bar
                    .println(format!("failed: {} ({error})", record.folder_name()));
                self.bar.inc(1);
            }
            Progress::Unarchived { record, error } => {
                self.bar
                    .println(format!("sent, not archived: {} ({error})", record.folder_name()));
                self.bar.inc(1);
            }
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Writes log lines to stderr around the progress bar.
#[derive(Clone)]
pub struct BarWriter {
    bar: ProgressBar,
}

impl Write for BarWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
