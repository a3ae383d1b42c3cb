use crate::endpoints::resolve;
use crate::model::{AuthScheme, AuthenticationProfile, EmbeddedData};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

const USERNAME_KEYWORDS: &[&str] = &["username", "email", "user", "login", "account"];
const PASSWORD_KEYWORDS: &[&str] = &["password", "pass", "pwd"];
const LOGIN_ACTION_KEYWORDS: &[&str] = &["login", "authenticate"];

/// What the classifier needs to know about one `<form>` on the page.
struct FormFacts {
    action: Option<String>,
    is_login_action: bool,
    is_multipart: bool,
    has_password: bool,
    fields: BTreeMap<String, String>,
}

/// Determines the authentication scheme in use on a fetched page.
///
/// Priority: a flow identifier (`eventId`) combined with a login form means
/// spring-security; a lone traditional password form means form-based; a
/// script-submitted login form coexisting with a traditional password form
/// means oauth-hybrid (both endpoints recorded); anything else is unknown.
/// An unknown result never displaces a specific `prior` profile.
pub fn classify(
    page_url: &Url,
    html: &str,
    embedded: &[EmbeddedData],
    prior: Option<&AuthenticationProfile>,
) -> AuthenticationProfile {
    let document = Html::parse_document(html);
    let forms = collect_forms(page_url, &document);
    let csrf_token = find_csrf_token(&document);
    let event_id = embedded_event_id(embedded);

    let login_form = forms.iter().find(|f| f.is_login_action && !f.is_multipart);
    let password_form = forms.iter().find(|f| f.has_password);

    let profile = if let Some(form) = login_form
        && let Some(event_id) = event_id.clone()
    {
        AuthenticationProfile {
            scheme: AuthScheme::SpringSecurity,
            login_endpoint: form.action.clone(),
            csrf_token,
            event_id: Some(event_id),
            fields: pick_fields(form, password_form),
            fallback_endpoint: None,
        }
    } else if let Some(pw_form) = password_form {
        // A login form that carries no password input is being submitted by
        // script; a separate traditional password form alongside it marks a
        // hybrid flow.
        let script_login = forms.iter().find(|f| {
            f.is_login_action && !f.is_multipart && !f.has_password
        });

        if let Some(api_form) = script_login {
            AuthenticationProfile {
                scheme: AuthScheme::OauthHybrid,
                login_endpoint: api_form.action.clone(),
                csrf_token,
                event_id: None,
                fields: pw_form.fields.clone(),
                fallback_endpoint: pw_form.action.clone(),
            }
        } else {
            AuthenticationProfile {
                scheme: AuthScheme::FormBased,
                login_endpoint: pw_form.action.clone(),
                csrf_token,
                event_id: None,
                fields: pw_form.fields.clone(),
                fallback_endpoint: None,
            }
        }
    } else {
        AuthenticationProfile::unknown()
    };

    // Confidence monotonicity: never report unknown over an established scheme.
    if profile.is_unknown()
        && let Some(prior) = prior
        && !prior.is_unknown()
    {
        debug!("classification stayed {} (new evidence inconclusive)", prior.scheme.as_str());
        return prior.clone();
    }

    profile
}

fn collect_forms(page_url: &Url, document: &Html) -> Vec<FormFacts> {
    let form_selector = Selector::parse("form").unwrap();
    let input_selector = Selector::parse("input").unwrap();

    document
        .select(&form_selector)
        .map(|form| {
            let action_attr = form.value().attr("action").unwrap_or("");
            let action = resolve(page_url, action_attr).map(|u| u.to_string());
            let action_lower = action_attr.to_ascii_lowercase();
            let enctype = form
                .value()
                .attr("enctype")
                .unwrap_or("")
                .to_ascii_lowercase();

            let mut has_password = false;
            let mut fields = BTreeMap::new();
            for input in form.select(&input_selector) {
                if input_type(&input) == "password" {
                    has_password = true;
                }
                map_input_roles(&input, &mut fields);
            }

            FormFacts {
                action,
                is_login_action: LOGIN_ACTION_KEYWORDS
                    .iter()
                    .any(|kw| action_lower.contains(kw)),
                is_multipart: enctype.contains("multipart"),
                has_password,
                fields,
            }
        })
        .collect()
}

/// Fields for a spring-security profile come from the login form itself, or
/// from a password form elsewhere on the page when the login form is bare.
fn pick_fields(login_form: &FormFacts, password_form: Option<&FormFacts>) -> BTreeMap<String, String> {
    if !login_form.fields.is_empty() {
        return login_form.fields.clone();
    }
    password_form.map(|f| f.fields.clone()).unwrap_or_default()
}

fn input_type(input: &ElementRef) -> String {
    input
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

/// Case-insensitive keyword match on name/id/placeholder, mapping logical
/// roles to concrete field names. First match per role wins.
fn map_input_roles(input: &ElementRef, fields: &mut BTreeMap<String, String>) {
    let Some(name) = input.value().attr("name") else {
        return;
    };
    let itype = input_type(input);
    if matches!(itype.as_str(), "hidden" | "submit" | "button" | "checkbox" | "radio") {
        return;
    }

    let haystack = format!(
        "{} {} {}",
        name,
        input.value().attr("id").unwrap_or(""),
        input.value().attr("placeholder").unwrap_or("")
    )
    .to_ascii_lowercase();

    if itype == "password" || PASSWORD_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        fields
            .entry("password".to_string())
            .or_insert_with(|| name.to_string());
    } else if itype == "email" || USERNAME_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        fields
            .entry("username".to_string())
            .or_insert_with(|| name.to_string());
    }
}

/// Token hunt order from the original flow analysis: `<meta name*=csrf>`,
/// then any `input[name*=csrf]`, with Spring's `_csrf` input as a tiebreaker.
fn find_csrf_token(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse("meta[name][content]").unwrap();
    for meta in document.select(&meta_selector) {
        if let Some(name) = meta.value().attr("name")
            && name.to_ascii_lowercase().contains("csrf")
            && let Some(content) = meta.value().attr("content")
            && !content.is_empty()
        {
            return Some(content.to_string());
        }
    }

    let input_selector = Selector::parse("input[name][value]").unwrap();
    let mut candidate = None;
    for input in document.select(&input_selector) {
        let name = input.value().attr("name").unwrap_or("");
        let value = input.value().attr("value").unwrap_or("");
        if value.is_empty() {
            continue;
        }
        if name == "_csrf" {
            return Some(value.to_string());
        }
        if name.to_ascii_lowercase().contains("csrf") && candidate.is_none() {
            candidate = Some(value.to_string());
        }
    }

    candidate
}

fn embedded_event_id(embedded: &[EmbeddedData]) -> Option<String> {
    embedded
        .iter()
        .find(|d| d.key == "eventId")
        .and_then(|d| match &d.value {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}
