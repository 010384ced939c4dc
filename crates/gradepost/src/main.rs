//! `gradepost` - mail corrected submissions back to students.
//!
//! Matches every folder in the submissions directory to a roster entry,
//! mails the student the PDF inside, and moves the folder to `Sent`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod progress;

use anyhow::{Context, Result, bail};
use clap::Parser;
use gradepost_core::{
    Config, Mailer, RunReport, SmtpTransport, SubmissionIndex, mailer, prepare, run,
};
use progress::{BarWriter, Reporter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gradepost", version, about = "Mail corrected submissions back to students")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Plain-text mail body sent to every student
    #[arg(long, default_value = "mail_body.txt")]
    body: PathBuf,

    /// Show which folder goes to whom without sending or moving anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let reporter = Reporter::new()?;
    init_logging(reporter.log_writer());

    execute(&cli, &reporter).await
}

fn init_logging(writer: BarWriter) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gradepost=info,gradepost_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();
}

async fn execute(cli: &Cli, reporter: &Reporter) -> Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    let mut index = prepare(&config).context("Failed to index submissions")?;

    if cli.dry_run {
        print_plan(&index);
        return Ok(());
    }

    let body = mailer::load_body(&cli.body)
        .with_context(|| format!("Failed to read mail body {}", cli.body.display()))?;

    if index.is_empty() {
        info!("Nothing to send");
        println!("Done");
        return Ok(());
    }

    let mailer = Mailer::new(&config.sender_data.mail, &config.subject, body);
    let mut transport =
        SmtpTransport::open(&config.smtp, &config.sender_data, config.send_timeout())
            .await
            .with_context(|| {
                format!(
                    "Failed to open mail session with {}:{}",
                    config.smtp.host, config.smtp.port
                )
            })?;

    let outcome = run(
        &mut index,
        &mailer,
        &mut transport,
        config.on_send_error,
        |event| reporter.handle(event),
    )
    .await;
    reporter.finish();
    let report = outcome.context("Sending stopped")?;

    if !report.is_complete() {
        summarize(&report);
        bail!(
            "{} of {} submissions were not sent, {} were sent but not archived",
            report.failed.len(),
            report.failed.len() + report.delivered(),
            report.unarchived.len()
        );
    }

    println!("Done");
    Ok(())
}

fn summarize(report: &RunReport) {
    if !report.failed.is_empty() {
        eprintln!("Not sent:");
        for failed in &report.failed {
            eprintln!("  {}: {}", failed.record.folder_name(), failed.error);
        }
    }
    if !report.unarchived.is_empty() {
        eprintln!("Sent, but still in the submissions directory (move to Sent by hand):");
        for unarchived in &report.unarchived {
            eprintln!("  {}: {}", unarchived.record.folder_name(), unarchived.error);
        }
    }
}

fn print_plan(index: &SubmissionIndex) {
    let pending = index.pending();
    let width = pending
        .iter()
        .map(|record| record.folder_name().chars().count())
        .max()
        .unwrap_or(0)
        .max("Folder".len());

    println!("{:<width$}  {:<30}  Email", "Folder", "Student");
    for record in &pending {
        let student = format!("{} | {}", record.first_name, record.last_name);
        println!("{:<width$}  {student:<30}  {}", record.folder_name(), record.email);
    }
    for skipped in index.skipped() {
        println!("skipped {}: {}", skipped.folder.display(), skipped.error);
    }
    println!(
        "{} submission(s) would be sent, archive: {}",
        pending.len(),
        index.sent_dir().display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_classic_layout() {
        let cli = Cli::parse_from(["gradepost"]);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.body, PathBuf::from("mail_body.txt"));
        assert!(!cli.dry_run);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "gradepost",
            "--config",
            "course/config.json",
            "--body",
            "course/body.txt",
            "--dry-run",
        ]);
        assert_eq!(cli.config, PathBuf::from("course/config.json"));
        assert_eq!(cli.body, PathBuf::from("course/body.txt"));
        assert!(cli.dry_run);
    }
}
