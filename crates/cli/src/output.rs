use std::time::Duration;

use retail_sim_shared::result::{HistoricalReport, PartitionOutcome, ReplenishStats, StreamingStats};

pub fn print_backfill(report: &HistoricalReport, elapsed: Duration, rows: (i64, i64)) {
    println!("\n========================================");
    println!("  Days:          {}", report.n_partitions());
    println!("  Receipts:      {}", report.total_receipts);
    println!("  Items:         {}", report.total_items);
    println!("  Failed days:   {}", report.failures().count());
    println!("  Time:          {:.2}s", elapsed.as_secs_f64());
    println!("  receipt rows:       {}", rows.0);
    println!("  receipt_item rows:  {}", rows.1);
    println!("========================================");

    for failed in report.failures() {
        let reason = match &failed.outcome {
            PartitionOutcome::Failed(e) => e.as_str(),
            PartitionOutcome::Cancelled => "cancelled",
            PartitionOutcome::Persisted => continue,
        };
        println!(
            "  {}  {} attempts  {}",
            failed.day, failed.attempts, reason
        );
    }
}

pub fn print_stream(stats: &StreamingStats) {
    println!("\n========================================");
    println!("  Days:       {}", stats.days);
    println!("  Refreshes:  {}", stats.refreshes);
    println!("  Events:     {}", stats.events);
    println!("  Persisted:  {}", stats.persisted);
    println!("  Errors:     {}", stats.errors);
    println!("========================================");
}

pub fn print_replenish(label: &str, stats: &ReplenishStats) {
    println!("\n========================================");
    println!("  Steps:      {}", stats.steps);
    println!("  {label}: {}", stats.applied);
    println!("  Errors:     {}", stats.errors);
    println!("========================================");
}
