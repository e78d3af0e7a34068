// Passive header hygiene checks on the target's landing page

use crate::finding::{Evidence, Finding, FindingType};
use redscan_scanner::FetchResponse;

pub const MISSING_HSTS: &str = "Missing HSTS";

/// Header hygiene problems on one response, as issue strings
pub fn header_issues(response: &FetchResponse) -> Vec<String> {
    let mut issues = Vec::new();

    if !response.has_header("strict-transport-security") {
        issues.push(MISSING_HSTS.to_string());
    }

    issues
}

/// At most one finding, listing every header issue on the response
pub fn check_security_headers(response: &FetchResponse) -> Option<Finding> {
    let issues = header_issues(response);
    if issues.is_empty() {
        return None;
    }
    Some(Finding::new(
        FindingType::Headers,
        None,
        Evidence::Issues(issues),
    ))
}
