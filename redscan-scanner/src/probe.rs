//! Reflection probing: submit an inert marker and look for it verbatim in the reply.
//!
//! A probe either produces a [`ProbeResult`] or nothing. Transport failures and
//! missing reflections both come back as `None`; neither says the input is safe.

use crate::fetcher::{FetchResponse, Fetcher};
use crate::marker::{MarkerSource, RandomMarkers};
use crate::result::{Form, FormMethod, ProbeKind, ProbeResult};
use tracing::{debug, info, warn};
use url::Url;

/// Characters of context kept on each side of the marker
pub const SNIPPET_CONTEXT: usize = 120;

/// Parameter tried when a query probe is given no names
pub const DEFAULT_PROBE_PARAM: &str = "q";

pub struct Prober {
    fetcher: Fetcher,
    markers: Box<dyn MarkerSource>,
}

impl Prober {
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_markers(fetcher, Box::new(RandomMarkers::new()))
    }

    pub fn with_markers(fetcher: Fetcher, markers: Box<dyn MarkerSource>) -> Self {
        Self { fetcher, markers }
    }

    /// Set every name in `param_names` to the marker and GET `url`
    pub async fn probe_query(
        &mut self,
        url: &Url,
        param_names: &[String],
        marker: Option<String>,
    ) -> Option<ProbeResult> {
        let kind = ProbeKind::ParamReflection;
        let marker = marker.unwrap_or_else(|| self.markers.next_marker(kind));

        let names: Vec<String> = if param_names.is_empty() {
            vec![DEFAULT_PROBE_PARAM.to_string()]
        } else {
            param_names.to_vec()
        };
        let params = fill(&names, &marker);

        debug!("Probing {} with params {:?}", url, names);
        let response = match self.fetcher.get_with_query(url, &params).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Query probe of {} failed: {}", url, e);
                return None;
            }
        };

        detect_reflection(kind, &marker, &response)
    }

    /// Fill every field of `form` with the marker and submit it the way the form would
    pub async fn probe_form(&mut self, form: &Form, marker: Option<String>) -> Option<ProbeResult> {
        if !form.is_probable() {
            debug!("Form {} has no named inputs, not probing", form.action);
            return None;
        }

        let kind = ProbeKind::FormReflection;
        let marker = marker.unwrap_or_else(|| self.markers.next_marker(kind));
        let names: Vec<String> = form.inputs.iter().map(|input| input.name.clone()).collect();
        let params = fill(&names, &marker);

        debug!(
            "Probing form {} {} ({} fields)",
            form.method.as_str(),
            form.action,
            params.len()
        );
        let sent = match form.method {
            FormMethod::Get => self.fetcher.get_with_query(&form.action, &params).await,
            FormMethod::Post => self.fetcher.post_form(&form.action, &params).await,
        };

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!("Form probe of {} failed: {}", form.action, e);
                return None;
            }
        };

        detect_reflection(kind, &marker, &response)
    }
}

fn fill(names: &[String], marker: &str) -> Vec<(String, String)> {
    names
        .iter()
        .map(|name| (name.clone(), marker.to_string()))
        .collect()
}

fn detect_reflection(kind: ProbeKind, marker: &str, response: &FetchResponse) -> Option<ProbeResult> {
    let Some(snippet) = snippet_around(&response.body, marker, SNIPPET_CONTEXT) else {
        debug!("Marker {} not reflected by {}", marker, response.url);
        return None;
    };

    info!("Marker {} reflected by {}", marker, response.url);
    Some(ProbeResult {
        kind,
        marker: marker.to_string(),
        url: response.url.clone(),
        status_code: response.status,
        snippet: snippet.to_string(),
    })
}

/// Up to `context` characters either side of the first exact occurrence of `needle`
pub fn snippet_around<'a>(haystack: &'a str, needle: &str, context: usize) -> Option<&'a str> {
    if needle.is_empty() {
        return None;
    }
    let start = haystack.find(needle)?;
    let end = start + needle.len();

    let from = haystack[..start]
        .char_indices()
        .rev()
        .take(context)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = haystack[end..]
        .char_indices()
        .nth(context)
        .map(|(i, _)| end + i)
        .unwrap_or(haystack.len());

    Some(&haystack[from..to])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetcherConfig;
    use crate::result::FormInput;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, Request, Respond, ResponseTemplate,
        matchers::{method, path},
    };

    /// Echoes the raw query string and body back, optionally HTML-escaped
    struct Echo {
        escape: bool,
    }

    impl Respond for Echo {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let mut echoed = request.url.query().unwrap_or_default().to_string();
            echoed.push_str(&String::from_utf8_lossy(&request.body));
            if self.escape {
                echoed = echoed.replace('_', "&#95;");
            }
            ResponseTemplate::new(200).set_body_string(format!(
                "<html><body><p>You searched for: {}</p></body></html>",
                echoed
            ))
        }
    }

    /// Hands out REFLF_0, REFLF_1, ... and remembers them
    struct Counting {
        issued: Arc<Mutex<Vec<String>>>,
    }

    impl MarkerSource for Counting {
        fn next_marker(&mut self, kind: ProbeKind) -> String {
            let mut issued = self.issued.lock().unwrap();
            let marker = format!("{}_{}", kind.marker_prefix(), issued.len());
            issued.push(marker.clone());
            marker
        }
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetcherConfig {
            timeout: Duration::from_millis(500),
            ..FetcherConfig::default()
        })
        .unwrap()
    }

    fn form(server: &MockServer, route: &str, method: FormMethod, names: &[&str]) -> Form {
        Form {
            action: Url::parse(&format!("{}{}", server.uri(), route)).unwrap(),
            method,
            inputs: names.iter().map(|n| FormInput::new(*n, "text")).collect(),
        }
    }

    #[test]
    fn test_snippet_is_bounded() {
        let body = format!("{}MARK{}", "a".repeat(500), "b".repeat(500));
        let snippet = snippet_around(&body, "MARK", 120).unwrap();
        assert_eq!(snippet.len(), 120 + 4 + 120);
        assert!(snippet.contains("MARK"));
    }

    #[test]
    fn test_snippet_clamps_at_edges_and_respects_utf8() {
        assert_eq!(snippet_around("MARK", "MARK", 120), Some("MARK"));
        assert_eq!(snippet_around("ééMARKüü", "MARK", 1), Some("éMARKü"));
        assert_eq!(snippet_around("nothing here", "MARK", 120), None);
    }

    #[test]
    fn test_snippet_uses_first_occurrence() {
        let body = "xxMARKyy----MARKzz";
        assert_eq!(snippet_around(body, "MARK", 2), Some("xxMARKyy"));
    }

    #[tokio::test]
    async fn test_post_form_reflection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(Echo { escape: false })
            .mount(&server)
            .await;

        let mut prober = Prober::with_markers(fetcher(), Box::new(RandomMarkers::seeded(3)));
        let form = form(&server, "/search", FormMethod::Post, &["q"]);
        let result = prober.probe_form(&form, None).await.expect("reflection");

        assert_eq!(result.kind, ProbeKind::FormReflection);
        assert!(result.marker.starts_with("REFLF_"));
        assert!(result.snippet.contains(&result.marker));
        assert_eq!(result.status_code, 200);
        assert_eq!(result.url.path(), "/search");
    }

    #[tokio::test]
    async fn test_get_form_reflection_with_supplied_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/find"))
            .respond_with(Echo { escape: false })
            .mount(&server)
            .await;

        let mut prober = Prober::new(fetcher());
        let form = form(&server, "/find", FormMethod::Get, &["a", "b"]);
        let result = prober
            .probe_form(&form, Some("CUSTOM_MARKER".to_string()))
            .await
            .expect("reflection");

        assert_eq!(result.marker, "CUSTOM_MARKER");
        assert!(result.url.as_str().contains("a=CUSTOM_MARKER"));
        assert!(result.url.as_str().contains("b=CUSTOM_MARKER"));
    }

    #[tokio::test]
    async fn test_encoded_reflection_is_no_finding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(Echo { escape: true })
            .mount(&server)
            .await;

        let mut prober = Prober::new(fetcher());
        let form = form(&server, "/search", FormMethod::Post, &["q"]);
        assert!(prober.probe_form(&form, None).await.is_none());
    }

    #[tokio::test]
    async fn test_no_reflection_is_no_finding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>static</p>"))
            .mount(&server)
            .await;

        let mut prober = Prober::new(fetcher());
        let url = Url::parse(&server.uri()).unwrap();
        assert!(prober.probe_query(&url, &[], None).await.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_no_finding() {
        let mut prober = Prober::new(fetcher());
        let refused = Url::parse("http://127.0.0.1:1/").unwrap();
        assert!(prober.probe_query(&refused, &[], None).await.is_none());

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        let slow = form(&server, "/slow", FormMethod::Post, &["q"]);
        assert!(prober.probe_form(&slow, None).await.is_none());
    }

    #[tokio::test]
    async fn test_query_probe_defaults_to_q() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(Echo { escape: false })
            .mount(&server)
            .await;

        let mut prober = Prober::new(fetcher());
        let url = Url::parse(&server.uri()).unwrap();
        let result = prober.probe_query(&url, &[], None).await.expect("reflection");
        assert_eq!(result.kind, ProbeKind::ParamReflection);
        assert!(result.marker.starts_with("REFLQ_"));
        let query: Vec<(String, String)> = result.url.query_pairs().into_owned().collect();
        assert_eq!(query, vec![("q".to_string(), result.marker.clone())]);
    }

    #[tokio::test]
    async fn test_form_without_inputs_is_not_submitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(Echo { escape: false })
            .expect(0)
            .mount(&server)
            .await;

        let mut prober = Prober::new(fetcher());
        let form = form(&server, "/noop", FormMethod::Post, &[]);
        assert!(prober.probe_form(&form, None).await.is_none());
    }

    #[tokio::test]
    async fn test_repeat_probes_use_distinct_markers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(Echo { escape: false })
            .mount(&server)
            .await;

        let issued = Arc::new(Mutex::new(Vec::new()));
        let markers = Counting {
            issued: issued.clone(),
        };
        let mut prober = Prober::with_markers(fetcher(), Box::new(markers));
        let form = form(&server, "/search", FormMethod::Post, &["q"]);

        let first = prober.probe_form(&form, None).await.expect("first");
        let second = prober.probe_form(&form, None).await.expect("second");

        assert_ne!(first.marker, second.marker);
        assert_eq!(issued.lock().unwrap().len(), 2);
    }
}
