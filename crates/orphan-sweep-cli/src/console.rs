use colored::*;
use orphan_sweep_core::report::RowOutcome;
use orphan_sweep_core::{ReportEvent, ReportSink};

/// Prints report events to stdout, colored by outcome.
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, event: &ReportEvent) {
        let line = event.to_string();
        match event {
            ReportEvent::Directory { .. } => {
                println!();
                println!("{}", line.bright_blue().bold());
            }
            ReportEvent::Row(row) => match row.outcome {
                RowOutcome::Found => println!("{}", line),
                RowOutcome::Deleted => println!("{}", line.green()),
                RowOutcome::Failed(_) => println!("{}", line.red()),
                RowOutcome::Skipped => println!("{}", line.yellow()),
            },
            ReportEvent::DirectorySummary { .. } => println!("{}", line.dimmed()),
            ReportEvent::Warning(_) => println!("{} {}", "⚠".yellow().bold(), line.yellow()),
            ReportEvent::RunSummary { .. } => {
                println!();
                println!("{}", line.bold());
            }
        }
    }
}
