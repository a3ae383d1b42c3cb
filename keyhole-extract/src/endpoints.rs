use crate::model::{DiscoveredEndpoint, EndpointSource, HttpMethod};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// Suffixes that mark a URL literal as a static asset rather than an API path.
const ASSET_SUFFIXES: &[&str] = &[
    ".css", ".js", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico", ".woff", ".woff2",
];

fn url_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'](https?://[^"'\s]+|/[^"'\s]+)["']"#).unwrap())
}

/// Scans page markup and inline script text for API endpoint candidates.
///
/// A candidate is any form action, anchor href, or quoted script URL literal
/// whose resolved path contains `marker` (typically "/api/"). Relative URLs
/// are resolved against `page_url`. Malformed markup yields an empty result.
pub fn extract_endpoints(page_url: &Url, html: &str, marker: &str) -> Vec<DiscoveredEndpoint> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<(String, HttpMethod)> = HashSet::new();
    let mut endpoints = Vec::new();

    let mut record = |url: String, method: HttpMethod, source: EndpointSource| {
        if seen.insert((url.clone(), method)) {
            debug!("endpoint candidate: {} {} ({})", method.as_str(), url, source.as_str());
            endpoints.push(DiscoveredEndpoint::new(url, method, source));
        }
    };

    // Forms: declared method, resolved action.
    let form_selector = Selector::parse("form[action]").unwrap();
    for form in document.select(&form_selector) {
        if let Some(action) = form.value().attr("action")
            && let Some(resolved) = resolve(page_url, action)
            && resolved.path().contains(marker)
        {
            let method = HttpMethod::from_form_attr(form.value().attr("method"));
            record(resolved.to_string(), method, EndpointSource::Form);
        }
    }

    // Anchors always contribute GET.
    let link_selector = Selector::parse("a[href]").unwrap();
    for anchor in document.select(&link_selector) {
        if let Some(href) = anchor.value().attr("href")
            && let Some(resolved) = resolve(page_url, href)
            && resolved.path().contains(marker)
            && !is_asset(resolved.path())
        {
            record(resolved.to_string(), HttpMethod::Get, EndpointSource::Anchor);
        }
    }

    // Inline script text: quoted URL literals.
    let script_selector = Selector::parse("script").unwrap();
    for script in document.select(&script_selector) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let text: String = script.text().collect();
        for caps in url_literal_re().captures_iter(&text) {
            let m = caps.get(1).unwrap();
            let literal = m.as_str();
            if is_asset(literal) {
                continue;
            }
            if let Some(resolved) = resolve(page_url, literal)
                && resolved.path().contains(marker)
            {
                let method = guess_script_method(&text, m.start(), literal);
                record(resolved.to_string(), method, EndpointSource::ScriptLiteral);
            }
        }
    }

    endpoints
}

fn is_asset(literal: &str) -> bool {
    let path = literal.split(['?', '#']).next().unwrap_or(literal);
    let lower = path.to_ascii_lowercase();
    ASSET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Best-effort verb inference for a script URL literal: the call site just
/// before the literal (`axios.post(`, `method: "PUT"`) wins, then the
/// login/auth keyword rule, then GET.
fn guess_script_method(script: &str, literal_start: usize, literal: &str) -> HttpMethod {
    let mut window_start = literal_start.saturating_sub(48);
    while !script.is_char_boundary(window_start) {
        window_start += 1;
    }
    let context = script[window_start..literal_start].to_ascii_lowercase();

    for (needle, method) in [
        ("post", HttpMethod::Post),
        ("put", HttpMethod::Put),
        ("delete", HttpMethod::Delete),
        ("patch", HttpMethod::Patch),
    ] {
        if context.contains(&format!(".{}(", needle))
            || context.contains(&format!("\"{}\"", needle))
            || context.contains(&format!("'{}'", needle))
        {
            return method;
        }
    }

    let lower = literal.to_ascii_lowercase();
    if ["login", "auth", "signin", "token"].iter().any(|kw| lower.contains(kw)) {
        return HttpMethod::Post;
    }

    HttpMethod::Get
}

/// Resolve an href/action against the page URL, skipping pseudo-links and
/// stripping fragments.
pub(crate) fn resolve(base: &Url, href: &str) -> Option<Url> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://accounts.example.com/login.htm").unwrap()
    }

    #[test]
    fn test_single_anchor_candidate() {
        let html = r#"<html><body><a href="/api/v2/users">Users</a></body></html>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://accounts.example.com/api/v2/users");
        assert_eq!(found[0].method, HttpMethod::Get);
        assert_eq!(found[0].source, EndpointSource::Anchor);
    }

    #[test]
    fn test_form_contributes_declared_method() {
        let html = r#"<form method="POST" action="/api/login"><input type="password" name="password"></form>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://accounts.example.com/api/login");
        assert_eq!(found[0].method, HttpMethod::Post);
        assert_eq!(found[0].source, EndpointSource::Form);
    }

    #[test]
    fn test_form_without_method_defaults_to_get() {
        let html = r#"<form action="/api/search"></form>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        assert_eq!(found[0].method, HttpMethod::Get);
    }

    #[test]
    fn test_script_literal_with_verb_context() {
        let html = r#"<script>
            axios.post('/api/v1/authenticate', credentials);
            fetch('/api/v1/profile');
        </script>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        let auth = found.iter().find(|e| e.url.ends_with("/authenticate")).unwrap();
        assert_eq!(auth.method, HttpMethod::Post);
        assert_eq!(auth.source, EndpointSource::ScriptLiteral);

        let profile = found.iter().find(|e| e.url.ends_with("/profile")).unwrap();
        assert_eq!(profile.method, HttpMethod::Get);
    }

    #[test]
    fn test_login_keyword_implies_post() {
        let html = r#"<script>var u = "/api/session/login";</script>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, HttpMethod::Post);
    }

    #[test]
    fn test_absolute_literals_kept_relative_resolved() {
        let html = r#"<script>
            fetch("https://other.example.com/api/feed");
            fetch("/api/local");
        </script>"#;
        let found = extract_endpoints(&page(), html, "/api/");

        let urls: Vec<&str> = found.iter().map(|e| e.url.as_str()).collect();
        assert!(urls.contains(&"https://other.example.com/api/feed"));
        assert!(urls.contains(&"https://accounts.example.com/api/local"));
    }

    #[test]
    fn test_assets_and_non_marker_paths_skipped() {
        let html = r#"
            <a href="/about">About</a>
            <a href="/api/app.js">bundle</a>
            <script>var s = "/api/theme.css";</script>
        "#;
        let found = extract_endpoints(&page(), html, "/api/");
        assert!(found.is_empty());
    }

    #[test]
    fn test_marker_is_configurable() {
        let html = r#"<a href="/rest/v1/items">items</a>"#;

        assert!(extract_endpoints(&page(), html, "/api/").is_empty());
        let found = extract_endpoints(&page(), html, "/rest/");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://accounts.example.com/rest/v1/items");
    }

    #[test]
    fn test_duplicates_collapse_by_identity() {
        let html = r#"
            <a href="/api/v2/users">one</a>
            <a href="/api/v2/users#section">two</a>
            <script>fetch("/api/v2/users");</script>
        "#;
        let found = extract_endpoints(&page(), html, "/api/");

        // Same (url, GET) identity from all three references.
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_pseudo_links_ignored() {
        let html = r##"
            <a href="javascript:void(0)">x</a>
            <a href="mailto:api@example.com">y</a>
            <a href="#/api/fragment">z</a>
        "##;
        assert!(extract_endpoints(&page(), html, "/api/").is_empty());
    }

    #[test]
    fn test_empty_and_malformed_markup() {
        assert!(extract_endpoints(&page(), "", "/api/").is_empty());
        assert!(extract_endpoints(&page(), "<form <a <<<", "/api/").is_empty());
    }
}
