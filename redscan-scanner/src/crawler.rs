use crate::extractor::{extract_forms, extract_links};
use crate::fetcher::Fetcher;
use crate::result::{CrawlOutcome, PageStatus, PageVisit};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(&PageVisit) + Send + Sync>;

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_POLITENESS_DELAY: Duration = Duration::from_millis(500);

/// Per-crawl traversal state. Created fresh for every call to [`Crawler::crawl`].
///
/// A URL enters `visited` at most once, and is never queued twice.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new(start: Url) -> Self {
        let mut frontier = Self::default();
        frontier.push(start);
        frontier
    }

    /// Queue `url` unless it has been visited or is already waiting
    pub fn push(&mut self, url: Url) -> bool {
        let key = url.as_str().to_string();
        if self.visited.contains(&key) || !self.queued.insert(key) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Next URL not yet visited, marking it visited
    pub fn next_unvisited(&mut self) -> Option<Url> {
        while let Some(url) = self.queue.pop_front() {
            let key = url.as_str().to_string();
            self.queued.remove(&key);
            if self.visited.insert(key) {
                return Some(url);
            }
        }
        None
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Bounded, polite, single-origin breadth-first crawler.
///
/// One fetch is in flight at a time, with a fixed pause between fetches.
pub struct Crawler {
    fetcher: Fetcher,
    max_pages: usize,
    politeness_delay: Duration,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            max_pages: DEFAULT_MAX_PAGES,
            politeness_delay: DEFAULT_POLITENESS_DELAY,
            progress_callback: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl everything reachable from `target` on its origin, up to the page cap.
    ///
    /// Dead pages, timeouts and non-200 responses are skipped, so this never
    /// fails. Hitting the cap looks the same as running out of links.
    pub async fn crawl(&self, target: &Url) -> CrawlOutcome {
        info!(
            "Starting crawl of {} (max {} pages, {:?} delay)",
            target, self.max_pages, self.politeness_delay
        );

        let mut frontier = Frontier::new(target.clone());
        let mut outcome = CrawlOutcome::default();

        while frontier.visited_count() < self.max_pages {
            let Some(url) = frontier.next_unvisited() else {
                break;
            };

            if frontier.visited_count() > 1 && !self.politeness_delay.is_zero() {
                tokio::time::sleep(self.politeness_delay).await;
            }

            let status = match self.fetcher.fetch(&url).await {
                Ok(response) if response.status == 200 && response.url.origin() != target.origin() => {
                    debug!("Skipping {} (redirected off-origin to {})", url, response.url);
                    PageStatus::OffOrigin
                }
                Ok(response) if response.status == 200 => {
                    // Relative links resolve against where redirects landed
                    let base = &response.url;
                    let links = extract_links(&response.body, base);
                    let forms = extract_forms(&response.body, base);
                    debug!(
                        "{}: {} links, {} forms",
                        url,
                        links.len(),
                        forms.len()
                    );

                    for link in links {
                        if frontier.push(link.clone()) {
                            debug!("  -> queued {}", link);
                        }
                    }
                    outcome.forms.extend(forms);
                    outcome.pages.push(url.clone());
                    PageStatus::Ok
                }
                Ok(response) => {
                    debug!("Skipping {} (HTTP {})", url, response.status);
                    PageStatus::HttpError(response.status)
                }
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    PageStatus::NetworkError
                }
            };

            if let Some(ref callback) = self.progress_callback {
                callback(&PageVisit {
                    index: frontier.visited_count(),
                    url,
                    status,
                });
            }
        }

        info!(
            "Crawl complete. {} pages, {} forms ({} URLs visited, {} left in queue)",
            outcome.pages.len(),
            outcome.forms.len(),
            frontier.visited_count(),
            frontier.pending()
        );
        outcome
    }
}
