use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP method a form submits with. Anything other than `post` is treated as `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMethod {
    #[default]
    Get,
    Post,
}

impl FormMethod {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            Some("post") => FormMethod::Post,
            _ => FormMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormMethod::Get => "get",
            FormMethod::Post => "post",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
}

impl FormInput {
    pub fn new(name: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
        }
    }
}

/// A form as discovered on a page. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub action: Url,
    pub method: FormMethod,
    pub inputs: Vec<FormInput>,
}

impl Form {
    /// Forms without a single named field have nothing to inject into.
    pub fn is_probable(&self) -> bool {
        !self.inputs.is_empty()
    }
}

/// How a visited URL turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Ok,
    HttpError(u16),
    NetworkError,
    /// Redirected to another origin; the body was not read for links or forms
    OffOrigin,
}

/// Reported to the crawler's progress callback once per dequeued URL
#[derive(Debug, Clone)]
pub struct PageVisit {
    pub index: usize,
    pub url: Url,
    pub status: PageStatus,
}

/// What a traversal produced: pages that answered 200, in visit order, and every form found on them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub pages: Vec<Url>,
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKind {
    #[serde(rename = "reflected-token")]
    ParamReflection,
    #[serde(rename = "reflected-token-form")]
    FormReflection,
}

impl ProbeKind {
    pub fn marker_prefix(&self) -> &'static str {
        match self {
            ProbeKind::ParamReflection => "REFLQ",
            ProbeKind::FormReflection => "REFLF",
        }
    }
}

/// Evidence that a marker came back verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "type")]
    pub kind: ProbeKind,
    #[serde(rename = "payload_used")]
    pub marker: String,
    pub url: Url,
    pub status_code: u16,
    pub snippet: String,
}
