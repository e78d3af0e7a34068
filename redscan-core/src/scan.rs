use crate::aggregate::FindingAggregator;
use crate::error::Result;
use crate::finding::Finding;
use indicatif::{ProgressBar, ProgressStyle};
use redscan_scanner::fetcher::DEFAULT_USER_AGENT;
use redscan_scanner::{
    CrawlOutcome, Crawler, Fetcher, FetcherConfig, Form, MarkerSource, PageStatus, PageVisit,
    ProbeResult, Prober, ProgressCallback,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Everything a scan needs to know up front. Fixed for the lifetime of the scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_pages: usize,
    pub politeness_delay: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    /// Names to probe on the start URL. Empty means "whatever it already has, else `q`".
    pub probe_params: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            politeness_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
            probe_params: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            max_redirects: self.max_redirects,
        }
    }
}

/// Options for configuring a scan operation
pub struct ScanOptions {
    pub config: ScanConfig,
    pub show_progress_bars: bool,
}

/// Pages, forms and findings from one completed scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub pages: Vec<Url>,
    pub forms: Vec<Form>,
    pub findings: Vec<Finding>,
}

/// The URL and parameter names to use when probing a page's query surface.
///
/// Probed names are stripped from the URL so the marker is their only value;
/// any other existing query pairs are kept.
pub fn query_surface(target: &Url, explicit: &[String]) -> (Url, Vec<String>) {
    let existing: Vec<(String, String)> = target.query_pairs().into_owned().collect();

    let mut names: Vec<String> = if explicit.is_empty() {
        existing.iter().map(|(k, _)| k.clone()).collect()
    } else {
        explicit.to_vec()
    };
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));

    let mut url = target.clone();
    url.set_fragment(None);
    url.set_query(None);
    let kept: Vec<&(String, String)> = existing.iter().filter(|(k, _)| !names.contains(k)).collect();
    if !kept.is_empty() {
        url.query_pairs_mut().extend_pairs(kept);
    }

    (url, names)
}

fn spinner(show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting scan...");
    Some(pb)
}

fn crawler_for(fetcher: Fetcher, config: &ScanConfig, progress_bar: Option<&ProgressBar>) -> Crawler {
    let mut crawler = Crawler::new(fetcher)
        .with_max_pages(config.max_pages)
        .with_politeness_delay(config.politeness_delay);

    if let Some(pb) = progress_bar {
        let pb = pb.clone();
        let callback: ProgressCallback = Arc::new(move |visit: &PageVisit| {
            let marker = match visit.status {
                PageStatus::Ok => "✓".to_string(),
                PageStatus::HttpError(code) => code.to_string(),
                PageStatus::NetworkError => "✗".to_string(),
                PageStatus::OffOrigin => "↪".to_string(),
            };
            pb.set_message(format!("Crawling... [{}] {} {}", visit.index, marker, visit.url));
        });
        crawler = crawler.with_progress_callback(callback);
    }

    crawler
}

/// Traversal only
pub async fn execute_crawl(target: &Url, options: &ScanOptions) -> Result<CrawlOutcome> {
    let fetcher = Fetcher::new(&options.config.fetcher_config())?;
    let progress_bar = spinner(options.show_progress_bars);

    let outcome = crawler_for(fetcher, &options.config, progress_bar.as_ref())
        .crawl(target)
        .await;

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Crawl complete! {} pages", outcome.pages.len()));
    }
    Ok(outcome)
}

/// One query-surface probe of `target`
pub async fn execute_probe(
    target: &Url,
    options: &ScanOptions,
    markers: Box<dyn MarkerSource>,
) -> Result<Option<ProbeResult>> {
    let fetcher = Fetcher::new(&options.config.fetcher_config())?;
    let mut prober = Prober::with_markers(fetcher, markers);
    let (url, names) = query_surface(target, &options.config.probe_params);
    Ok(prober.probe_query(&url, &names, None).await)
}

/// Crawl `target`, then check its headers and probe its query surface and every discovered form.
///
/// Individual page and probe failures never fail the scan; the only error is
/// being unable to build the HTTP client.
pub async fn execute_scan(
    target: &Url,
    options: &ScanOptions,
    markers: Box<dyn MarkerSource>,
) -> Result<ScanOutcome> {
    let config = &options.config;
    let fetcher = Fetcher::new(&config.fetcher_config())?;
    let progress_bar = spinner(options.show_progress_bars);

    info!("Scanning {}", target);
    let crawl = crawler_for(fetcher.clone(), config, progress_bar.as_ref())
        .crawl(target)
        .await;

    let mut aggregator = FindingAggregator::new();

    if let Some(ref pb) = progress_bar {
        pb.set_message("Checking headers...");
    }
    match fetcher.fetch(target).await {
        Ok(response) if response.status < 400 => aggregator.record_headers(&response),
        Ok(response) => debug!(
            "Not checking headers of {} (HTTP {})",
            target, response.status
        ),
        Err(e) => warn!("Could not re-fetch {} for header checks: {}", target, e),
    }

    let mut prober = Prober::with_markers(fetcher, markers);

    if let Some(ref pb) = progress_bar {
        pb.set_message(format!("Probing query surface of {}...", target));
    }
    let (surface, names) = query_surface(target, &config.probe_params);
    let result = prober.probe_query(&surface, &names, None).await;
    aggregator.record_query_probe(target, result);

    for (i, form) in crawl.forms.iter().enumerate() {
        if let Some(ref pb) = progress_bar {
            pb.set_message(format!(
                "Probing form {}/{}: {} {}",
                i + 1,
                crawl.forms.len(),
                form.method.as_str(),
                form.action
            ));
        }
        let result = prober.probe_form(form, None).await;
        aggregator.record_form_probe(form, result);
    }

    let findings = aggregator.into_findings();
    info!(
        "Scan of {} complete: {} pages, {} forms, {} findings",
        target,
        crawl.pages.len(),
        crawl.forms.len(),
        findings.len()
    );
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Scan complete! {} pages, {} findings",
            crawl.pages.len(),
            findings.len()
        ));
    }

    Ok(ScanOutcome {
        pages: crawl.pages,
        forms: crawl.forms,
        findings,
    })
}
