use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use futures::future::join_all;
use redscan_core::report::render_report;
use redscan_core::{
    ReportFormat, ScanConfig, ScanOptions, ScanReport, ScanStatus, SnapshotStore, execute_crawl,
    execute_probe, execute_scan,
};
use redscan_scanner::{RandomMarkers, parse_target};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use url::Url;

// Helper functions for the scan handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<Url>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        parse_target(url.as_str())
            .map(|url| vec![url])
            .map_err(|e| e.to_string())
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file, skipping blank lines and `#` comments
pub fn load_urls_from_file(path: &Path) -> Result<Vec<Url>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<Url> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a scan target, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<Url> {
    if let Ok(url) = parse_target(line) {
        return Some(url);
    }

    // `example.com` and `localhost:8080` both land here
    if let Ok(url) = parse_target(&format!("http://{}", line)) {
        return Some(url);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// `YYYYMMDDHHMMSS`, suffixed with `-<n>` when several scans start together
pub fn generate_scan_id(now: DateTime<Utc>, index: usize, total: usize) -> String {
    let stamp = now.format("%Y%m%d%H%M%S").to_string();
    if total > 1 {
        format!("{}-{}", stamp, index + 1)
    } else {
        stamp
    }
}

pub fn expand_data_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Flags shared by `scan`, `crawl` and `probe`. Flags a subcommand doesn't define keep their defaults.
pub fn scan_config_from_matches(sub_matches: &ArgMatches) -> ScanConfig {
    let mut config = ScanConfig::default();

    if let Ok(Some(max_pages)) = sub_matches.try_get_one::<usize>("max-pages") {
        config.max_pages = *max_pages;
    }
    if let Ok(Some(delay)) = sub_matches.try_get_one::<u64>("delay-ms") {
        config.politeness_delay = Duration::from_millis(*delay);
    }
    if let Ok(Some(timeout)) = sub_matches.try_get_one::<u64>("timeout") {
        config.timeout = Duration::from_secs(*timeout);
    }
    if let Ok(Some(user_agent)) = sub_matches.try_get_one::<String>("user-agent") {
        config.user_agent = user_agent.clone();
    }
    if let Ok(Some(params)) = sub_matches.try_get_many::<String>("param") {
        config.probe_params = params.cloned().collect();
    }

    config
}

fn report_format(sub_matches: &ArgMatches) -> ReportFormat {
    sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

/// Drive one scan through its snapshot lifecycle.
///
/// A snapshot is written on every state change, so `show` can follow a scan
/// from another terminal while it runs.
pub async fn run_scan(
    target: Url,
    scan_id: String,
    options: &ScanOptions,
    store: &SnapshotStore,
) -> anyhow::Result<ScanReport> {
    let mut report = ScanReport::pending(scan_id, Some(target.clone()));
    store.save(&report)?;

    report.start()?;
    store.save(&report)?;

    match execute_scan(&target, options, Box::new(RandomMarkers::new())).await {
        Ok(outcome) => report.finish(outcome)?,
        Err(e) => {
            error!("Scan {} of {} failed: {}", report.scan_id, target, e);
            report.fail(&e)?;
        }
    }

    let path = store.save(&report)?;
    info!("Scan {} {} ({})", report.scan_id, report.status, path.display());
    Ok(report)
}

fn render_all(reports: &[ScanReport], format: ReportFormat) -> anyhow::Result<String> {
    if format == ReportFormat::Json && reports.len() > 1 {
        return Ok(serde_json::to_string_pretty(reports)?);
    }

    let mut out = String::new();
    for report in reports {
        out.push_str(&render_report(report, format)?);
        out.push('\n');
    }
    Ok(out)
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let targets = load_urls_from_source(url, hosts_file).map_err(anyhow::Error::msg)?;

    let data_dir = sub_matches
        .get_one::<String>("data-dir")
        .map(|d| expand_data_dir(d))
        .context("--data-dir is required")?;
    let store = SnapshotStore::new(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

    let config = scan_config_from_matches(sub_matches);
    let total = targets.len();

    println!("\n🔎 Scanning {} host(s)", total);
    println!("Max pages: {}", config.max_pages);
    println!("Delay: {}ms", config.politeness_delay.as_millis());
    println!("Snapshots: {}\n", store.dir().display());

    // Concurrent spinners would overwrite each other
    let options = ScanOptions {
        config,
        show_progress_bars: !quiet && total == 1,
    };

    let now = Utc::now();
    let scans = targets.into_iter().enumerate().map(|(i, target)| {
        let scan_id = generate_scan_id(now, i, total);
        println!("{} Scan {} started for {}", "→".blue(), scan_id.bold(), target);
        run_scan(target, scan_id, &options, &store)
    });
    let results = join_all(scans).await;

    let mut reports = Vec::with_capacity(total);
    let mut failures = 0;
    for result in results {
        match result {
            Ok(report) => {
                if report.status == ScanStatus::Error {
                    failures += 1;
                }
                reports.push(report);
            }
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                failures += 1;
            }
        }
    }

    println!("\n{} Scan complete!\n", "✓".green().bold());

    let rendered = render_all(&reports, report_format(sub_matches))?;
    if let Some(output) = sub_matches.get_one::<PathBuf>("output") {
        fs::write(output, &rendered)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        println!("{} Report saved to {}", "✓".green().bold(), output.display());
    } else {
        print!("{}", rendered);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} scans failed", failures, total);
    }
    Ok(())
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<Url>("url").context("--url is required")?;
    let target = parse_target(url.as_str())?;

    let options = ScanOptions {
        config: scan_config_from_matches(sub_matches),
        show_progress_bars: !quiet,
    };

    println!("\n🕷️  Crawling {}", target.host_str().unwrap_or("unknown"));
    println!("Max pages: {}\n", options.config.max_pages);

    let outcome = execute_crawl(&target, &options).await?;

    println!("\n{} Crawl complete!\n", "✓".green().bold());
    println!("# Pages ({}):", outcome.pages.len());
    for page in &outcome.pages {
        println!("  {} {}", "✓".green(), page);
    }

    println!("\n# Forms ({}):", outcome.forms.len());
    for form in &outcome.forms {
        let inputs: Vec<String> = form
            .inputs
            .iter()
            .map(|input| format!("{}:{}", input.name, input.input_type))
            .collect();
        println!(
            "  {} {} [{}]",
            form.method.as_str().to_uppercase().cyan(),
            form.action,
            inputs.join(", ").bright_black()
        );
    }

    Ok(())
}

pub async fn handle_probe(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<Url>("url").context("--url is required")?;
    let target = parse_target(url.as_str())?;

    let options = ScanOptions {
        config: scan_config_from_matches(sub_matches),
        show_progress_bars: false,
    };

    match execute_probe(&target, &options, Box::new(RandomMarkers::new())).await? {
        Some(result) => {
            println!(
                "{} Marker {} reflected by {}",
                "[HIGH]".red().bold(),
                result.marker.bold(),
                result.url
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => println!("{} No reflection observed for {}", "✓".green().bold(), target),
    }

    Ok(())
}

pub fn handle_show(sub_matches: &ArgMatches) -> anyhow::Result<()> {
    let scan_id = sub_matches
        .get_one::<String>("SCAN_ID")
        .context("SCAN_ID is required")?;
    let data_dir = sub_matches
        .get_one::<String>("data-dir")
        .map(|d| expand_data_dir(d))
        .context("--data-dir is required")?;

    let store = SnapshotStore::new(&data_dir)?;
    let report = store.load(scan_id)?;
    print!("{}", render_report(&report, report_format(sub_matches))?);
    Ok(())
}
