pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod marker;
pub mod probe;
pub mod result;

pub use crawler::{Crawler, Frontier, ProgressCallback};
pub use error::ScanError;
pub use fetcher::{FetchResponse, Fetcher, FetcherConfig, parse_target};
pub use marker::{MarkerSource, RandomMarkers};
pub use probe::Prober;
pub use result::{CrawlOutcome, Form, FormInput, FormMethod, PageStatus, PageVisit, ProbeKind, ProbeResult};
