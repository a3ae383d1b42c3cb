use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verb attached to a discovered endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Parse a form `method` attribute. Unknown or missing verbs fall back to GET,
    /// matching browser behavior.
    pub fn from_form_attr(attr: Option<&str>) -> Self {
        match attr.map(|m| m.trim().to_ascii_uppercase()).as_deref() {
            Some("POST") => HttpMethod::Post,
            Some("PUT") => HttpMethod::Put,
            Some("DELETE") => HttpMethod::Delete,
            Some("PATCH") => HttpMethod::Patch,
            _ => HttpMethod::Get,
        }
    }
}

/// Where in the page an endpoint candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointSource {
    Form,
    Anchor,
    ScriptLiteral,
}

impl EndpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointSource::Form => "form",
            EndpointSource::Anchor => "anchor",
            EndpointSource::ScriptLiteral => "script-literal",
        }
    }
}

/// A single API endpoint candidate. Identity is (url, method); `source` and
/// `discovered_at` are informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredEndpoint {
    pub url: String,
    pub method: HttpMethod,
    pub source: EndpointSource,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredEndpoint {
    pub fn new(url: String, method: HttpMethod, source: EndpointSource) -> Self {
        Self {
            url,
            method,
            source,
            discovered_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> (&str, HttpMethod) {
        (&self.url, self.method)
    }
}

/// Authentication scheme variants Keyhole can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    SpringSecurity,
    FormBased,
    OauthHybrid,
    Unknown,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::SpringSecurity => "spring-security",
            AuthScheme::FormBased => "form-based",
            AuthScheme::OauthHybrid => "oauth-hybrid",
            AuthScheme::Unknown => "unknown",
        }
    }
}

/// Per-domain login mechanism description produced by the classifier.
///
/// `fields` maps logical roles ("username", "password") to the concrete form
/// field names found on the page. `fallback_endpoint` is only populated for
/// oauth-hybrid pages, where both a JSON login endpoint and a traditional
/// form target were found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationProfile {
    pub scheme: AuthScheme,
    pub login_endpoint: Option<String>,
    pub csrf_token: Option<String>,
    pub event_id: Option<String>,
    #[serde(default)]
    pub fields: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub fallback_endpoint: Option<String>,
}

impl AuthenticationProfile {
    pub fn unknown() -> Self {
        Self {
            scheme: AuthScheme::Unknown,
            login_endpoint: None,
            csrf_token: None,
            event_id: None,
            fields: Default::default(),
            fallback_endpoint: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.scheme == AuthScheme::Unknown
    }
}

/// One named JSON payload lifted out of page script text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedData {
    pub key: String,
    pub value: Value,
}

impl EmbeddedData {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}
