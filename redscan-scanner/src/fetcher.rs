use crate::error::{Result, ScanError};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "ReD-Scanner/0.1";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
        }
    }
}

/// Parse a scan target. Only absolute http(s) URLs with a host are crawlable.
pub fn parse_target(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ScanError::InvalidUrl(format!("{}: not an http(s) URL", raw))),
    }
}

/// A fully read HTTP response. `url` is where we ended up after redirects.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub elapsed: Duration,
}

impl FetchResponse {
    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// Funnel for every request a scan makes. Cloning is cheap and shares the
/// underlying connection pool, so one `Fetcher` is the session for a scan.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Plain GET. Any HTTP status is a successful fetch; only transport
    /// failures and timeouts are errors.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        self.execute(self.client.get(url.clone())).await
    }

    /// GET with `params` appended to whatever query `url` already carries
    pub async fn get_with_query(&self, url: &Url, params: &[(String, String)]) -> Result<FetchResponse> {
        self.execute(self.client.get(url.clone()).query(params)).await
    }

    /// POST with an `application/x-www-form-urlencoded` body
    pub async fn post_form(&self, url: &Url, params: &[(String, String)]) -> Result<FetchResponse> {
        self.execute(self.client.post(url.clone()).form(params)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<FetchResponse> {
        let start = Instant::now();
        let response = request.timeout(self.timeout).send().await?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        let elapsed = start.elapsed();

        debug!("{} {} ({} bytes, {:?})", status, url, body.len(), elapsed);

        Ok(FetchResponse {
            url,
            status,
            headers,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path, query_param},
    };

    fn fetcher_with_timeout(timeout: Duration) -> Fetcher {
        Fetcher::new(&FetcherConfig {
            timeout,
            ..FetcherConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target(" http://example.com ").unwrap().as_str(),
            "http://example.com/"
        );
        assert!(parse_target("https://example.com:8443/app?x=1").is_ok());
        assert!(matches!(parse_target("ftp://example.com"), Err(ScanError::InvalidUrl(_))));
        assert!(matches!(parse_target("not a url"), Err(ScanError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_returns_status_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Strict-Transport-Security", "max-age=31536000")
                    .set_body_string("hello"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetcherConfig::default()).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let response = fetcher.fetch(&url).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hello");
        assert!(response.has_header("strict-transport-security"));
        assert_eq!(
            response.header("STRICT-TRANSPORT-SECURITY"),
            Some("max-age=31536000")
        );
    }

    #[tokio::test]
    async fn test_non_200_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetcherConfig::default()).unwrap();
        let url = Url::parse(&server.uri()).unwrap().join("/missing").unwrap();
        let response = fetcher.fetch(&url).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_timeout_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = fetcher_with_timeout(Duration::from_millis(200));
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
    }

    #[tokio::test]
    async fn test_get_with_query_keeps_existing_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "2"))
            .and(query_param("q", "marker"))
            .respond_with(ResponseTemplate::new(200).set_body_string("matched"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetcherConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/search?page=2", server.uri())).unwrap();
        let params = vec![("q".to_string(), "marker".to_string())];
        let response = fetcher.get_with_query(&url, &params).await.unwrap();
        assert_eq!(response.body, "matched");
    }

    #[tokio::test]
    async fn test_post_form_encodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("user=alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string("posted"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&FetcherConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/login", server.uri())).unwrap();
        let params = vec![("user".to_string(), "alice".to_string())];
        let response = fetcher.post_form(&url, &params).await.unwrap();
        assert_eq!(response.body, "posted");
    }
}
