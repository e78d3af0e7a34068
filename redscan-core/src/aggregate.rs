use crate::finding::{Evidence, Finding, FindingType};
use crate::security::check_security_headers;
use redscan_scanner::{FetchResponse, Form, ProbeResult};
use tracing::debug;
use url::Url;

/// Append-only list of findings for one scan, in discovery order.
///
/// Nothing is merged or deduplicated; every probe hit stands on its own.
#[derive(Debug, Default)]
pub struct FindingAggregator {
    findings: Vec<Finding>,
}

impl FindingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_headers(&mut self, response: &FetchResponse) {
        if let Some(finding) = check_security_headers(response) {
            debug!("Header finding for {}: {:?}", response.url, finding.evidence);
            self.findings.push(finding);
        }
    }

    pub fn record_query_probe(&mut self, target: &Url, result: Option<ProbeResult>) {
        if let Some(result) = result {
            self.findings.push(Finding::new(
                FindingType::ReflectedParamProbable,
                Some(target.clone()),
                Evidence::Reflection(result),
            ));
        }
    }

    pub fn record_form_probe(&mut self, form: &Form, result: Option<ProbeResult>) {
        if let Some(result) = result {
            self.findings.push(Finding::new(
                FindingType::ReflectedXssProbable,
                Some(form.action.clone()),
                Evidence::Reflection(result),
            ));
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
