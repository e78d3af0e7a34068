pub mod aggregate;
pub mod error;
pub mod finding;
pub mod report;
pub mod scan;
pub mod security;

use colored::Colorize;

pub use aggregate::FindingAggregator;
pub use error::CoreError;
pub use finding::{Evidence, Finding, FindingType, Severity};
pub use report::{ReportFormat, ScanReport, ScanStatus, SnapshotStore};
pub use scan::{ScanConfig, ScanOptions, ScanOutcome, execute_crawl, execute_probe, execute_scan};

pub fn print_banner() {
    let banner = r#"
  ____  ___ ____
 |  _ \| __|  _ \ ___  ___ __ _ _ __
 | |_) |  _|| | | / __|/ __/ _` | '_ \
 |  _ <| |__| |_| \__ \ (_| (_| | | | |
 |_| \_\____|____/|___/\___\__,_|_| |_|
"#;
    println!("{}", banner.bright_red().bold());
    println!(
        "  {} {}\n",
        "crawl, probe, report".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
