use redscan_scanner::ProbeResult;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingType {
    #[serde(rename = "headers")]
    Headers,
    #[serde(rename = "reflected-param-probable")]
    ReflectedParamProbable,
    #[serde(rename = "reflected-xss-probable")]
    ReflectedXssProbable,
}

impl FindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingType::Headers => "headers",
            FindingType::ReflectedParamProbable => "reflected-param-probable",
            FindingType::ReflectedXssProbable => "reflected-xss-probable",
        }
    }

    /// Fixed severity table. There is no scoring, each type has one severity.
    pub fn severity(&self) -> Severity {
        match self {
            FindingType::Headers => Severity::Medium,
            FindingType::ReflectedParamProbable => Severity::High,
            FindingType::ReflectedXssProbable => Severity::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    /// Short human-readable issues, e.g. `["Missing HSTS"]`
    Issues(Vec<String>),
    Reflection(ProbeResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Url>,
    pub evidence: Evidence,
}

impl Finding {
    pub fn new(finding_type: FindingType, target: Option<Url>, evidence: Evidence) -> Self {
        Self {
            finding_type,
            severity: finding_type.severity(),
            target,
            evidence,
        }
    }
}
