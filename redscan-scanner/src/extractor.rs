//! Link and form extraction from HTML bodies.
//!
//! Extraction never fails: markup the parser can't make sense of just yields
//! fewer (or no) links and forms.

use crate::result::{Form, FormInput, FormMethod};
use scraper::node::Element;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// The only attributes extraction cares about. Keeps the walk independent of
/// which parser produced the element.
pub trait ElementCapabilities {
    fn href(&self) -> Option<&str>;
    fn field_name(&self) -> Option<&str>;
    fn action(&self) -> Option<&str>;
    fn method(&self) -> Option<&str>;
    fn field_type(&self) -> Option<&str>;
}

impl ElementCapabilities for Element {
    fn href(&self) -> Option<&str> {
        self.attr("href")
    }

    fn field_name(&self) -> Option<&str> {
        self.attr("name").filter(|name| !name.is_empty())
    }

    fn action(&self) -> Option<&str> {
        self.attr("action")
    }

    fn method(&self) -> Option<&str> {
        self.attr("method")
    }

    fn field_type(&self) -> Option<&str> {
        self.attr("type")
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Same-origin links reachable from `html`, in document order without duplicates.
///
/// Fragments are stripped, so `/a#x` and `/a#y` collapse into `/a`.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().href() else {
            continue;
        };
        let Some(link) = resolve_link(base, href) else {
            continue;
        };
        if link.origin() != base.origin() {
            debug!("Skipping off-origin link {}", link);
            continue;
        }
        if seen.insert(link.as_str().to_string()) {
            links.push(link);
        }
    }

    links
}

/// Every form on the page. Forms with no named fields are kept with an empty
/// input list.
pub fn extract_forms(html: &str, base: &Url) -> Vec<Form> {
    let (Some(form_selector), Some(field_selector)) =
        (selector("form"), selector("input, textarea, select"))
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut forms = Vec::new();

    for form in document.select(&form_selector) {
        let element = form.value();
        let action = resolve_action(base, element.action());

        let inputs = form
            .select(&field_selector)
            .filter_map(|field| {
                let field = field.value();
                field
                    .field_name()
                    .map(|name| FormInput::new(name, field.field_type().unwrap_or("text")))
            })
            .collect();

        forms.push(Form {
            action,
            method: FormMethod::parse(element.method()),
            inputs,
        });
    }

    forms
}

fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// An absent, blank or unresolvable action submits back to the page itself
fn resolve_action(base: &Url, action: Option<&str>) -> Url {
    let mut resolved = match action.map(str::trim) {
        None | Some("") => base.clone(),
        Some(action) => base.join(action).unwrap_or_else(|e| {
            debug!("Unresolvable form action {:?} ({}), using {}", action, e, base);
            base.clone()
        }),
    };
    resolved.set_fragment(None);
    resolved
}
