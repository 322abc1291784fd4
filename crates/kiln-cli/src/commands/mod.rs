pub mod build;
pub mod chat;
pub mod export;
pub mod preview;
pub mod templates;

use colored::Colorize;
use kiln_application::ChatOutcome;
use kiln_core::FileRecord;
use kiln_core::quality::{CheckKind, QualityCheck};

pub fn print_outcome(outcome: &ChatOutcome) {
    if let Some(reasoning) = &outcome.result.reasoning {
        println!("{}", "Thinking:".bright_black().bold());
        for line in reasoning.lines() {
            println!("  {}", line.bright_black());
        }
        println!();
    }
    for line in outcome.result.message.lines() {
        println!("{}", line.bright_blue());
    }
    if !outcome.result.files.is_empty() {
        print_files(&outcome.result.files);
    }
}

pub fn print_files(files: &[FileRecord]) {
    for file in files {
        println!(
            "  {} {}",
            format!("[{}]", file.language).bright_black(),
            file.name.green()
        );
    }
}

pub fn print_log_line(line: &str) {
    if line.contains('✗') || line.contains('❌') {
        eprintln!("{}", line.red());
    } else if line.contains('✓') {
        eprintln!("{}", line.bright_black());
    } else {
        eprintln!("{}", line.yellow());
    }
}

pub fn print_quality(checks: &[QualityCheck]) {
    if checks.is_empty() {
        println!("{}", "No findings.".bright_black());
    }
    for check in checks {
        let line = match check.kind {
            CheckKind::Success => format!("✓ {}", check.message).green(),
            CheckKind::Warning => format!("! {}", check.message).yellow(),
            CheckKind::Info => format!("i {}", check.message).bright_black(),
        };
        println!("{line}");
    }
}
