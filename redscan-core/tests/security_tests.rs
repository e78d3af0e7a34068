// Tests for header hygiene checks and the severity table

use redscan_core::finding::{Evidence, FindingType, Severity};
use redscan_core::security::{MISSING_HSTS, check_security_headers, header_issues};
use redscan_scanner::FetchResponse;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;

fn response_with_headers(headers: &[(&str, &str)]) -> FetchResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    FetchResponse {
        url: Url::parse("https://example.com/").unwrap(),
        status: 200,
        headers: map,
        body: String::new(),
        elapsed: Duration::from_millis(5),
    }
}

// ============================================================================
// Header Checks
// ============================================================================

#[test]
fn test_missing_hsts_is_reported() {
    let response = response_with_headers(&[("content-type", "text/html")]);
    let finding = check_security_headers(&response).expect("finding");

    assert_eq!(finding.finding_type, FindingType::Headers);
    assert_eq!(finding.severity, Severity::Medium);
    assert!(finding.target.is_none());
    assert_eq!(finding.evidence, Evidence::Issues(vec![MISSING_HSTS.to_string()]));
}

#[test]
fn test_present_hsts_is_not_reported() {
    let response = response_with_headers(&[("strict-transport-security", "max-age=63072000")]);
    assert!(check_security_headers(&response).is_none());
    assert!(header_issues(&response).is_empty());
}

#[test]
fn test_hsts_lookup_ignores_case() {
    let response = response_with_headers(&[("Strict-Transport-Security", "max-age=1")]);
    assert!(check_security_headers(&response).is_none());
}

#[test]
fn test_no_headers_at_all() {
    let response = response_with_headers(&[]);
    assert_eq!(header_issues(&response), vec![MISSING_HSTS.to_string()]);
}

// ============================================================================
// Severity Policy
// ============================================================================

#[test]
fn test_severity_table() {
    assert_eq!(FindingType::Headers.severity(), Severity::Medium);
    assert_eq!(FindingType::ReflectedXssProbable.severity(), Severity::High);
    assert_eq!(FindingType::ReflectedParamProbable.severity(), Severity::High);
}

#[test]
fn test_type_and_severity_strings() {
    assert_eq!(FindingType::Headers.as_str(), "headers");
    assert_eq!(FindingType::ReflectedXssProbable.as_str(), "reflected-xss-probable");
    assert_eq!(FindingType::ReflectedParamProbable.as_str(), "reflected-param-probable");
    assert_eq!(Severity::High.as_str(), "high");
    assert_eq!(Severity::Medium.as_str(), "medium");
}
