//! Shipping run statistics.

use std::time::Duration;

use observability::PublishSummary;

/// Statistics from one `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Lines read from the input
    pub lines_read: u64,

    /// Lines accepted by the appender
    pub lines_accepted: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Whether the run ended on a shutdown signal
    pub interrupted: bool,

    /// Cache publish statistics
    pub publish: PublishSummary,

    /// Per-sink counters: (name, started, ended, failures)
    pub sinks: Vec<(String, u64, u64, u64)>,
}

impl RunStats {
    /// Lines per second throughput
    pub fn lines_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.lines_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print summary to stdout
    pub fn print_summary(&self) {
        println!("\n=== Run Summary ===");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "Lines read: {} ({:.1}/s), accepted: {}",
            self.lines_read,
            self.lines_per_sec(),
            self.lines_accepted
        );
        if self.interrupted {
            println!("Stopped by shutdown signal");
        }

        println!();
        print!("{}", self.publish);

        if !self.sinks.is_empty() {
            println!("\nSinks:");
            for (name, started, ended, failures) in &self.sinks {
                println!(
                    "  - {}: started={}, ended={}, failures={}",
                    name, started, ended, failures
                );
            }
        }
        println!();
    }
}
