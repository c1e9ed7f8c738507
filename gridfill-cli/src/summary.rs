use colored::*;
use gridfill::{BatchOutcome, BatchReport};

/// Prints a batch report for the operator.
pub fn display(report: &BatchReport) {
    println!();
    println!("{}", "═".repeat(60));

    match &report.outcome {
        BatchOutcome::Completed if report.failed_fields() == 0 => {
            println!(
                "{} {} row(s) filled",
                "✅ SUCCESS:".green().bold(),
                report.rows.len()
            );
        }
        BatchOutcome::Completed => {
            println!(
                "{} {} field(s) could not be set",
                "⚠️  PARTIAL:".yellow().bold(),
                report.failed_fields()
            );
        }
        BatchOutcome::Aborted(e) => {
            println!("{} {e}", "❌ ABORTED:".red().bold());
        }
    }

    println!("{}", "─".repeat(60));
    println!("📊 Batch Details:");
    println!("   • Rows requested: {}", report.requested);
    println!("   • Records supplied: {}", report.records);
    println!("   • Rows filled: {}", report.rows.len());
    if report.unfilled_rows > 0 {
        println!("   • Rows left empty: {}", report.unfilled_rows);
    }
    if !report.missing_columns.is_empty() {
        let names: Vec<&str> = report.missing_columns.iter().map(|c| c.label()).collect();
        println!("   • Missing columns: {}", names.join(", "));
    }

    for (i, row) in report.rows.iter().enumerate() {
        if row.is_complete() {
            continue;
        }
        println!("{}", "─".repeat(60));
        println!("Row {}:", i + 1);
        for field in row.failures() {
            if let Err(e) = &field.result {
                println!("   {} {}: {e}", "✗".red(), field.field);
            }
        }
    }
    println!("{}", "═".repeat(60));
}
