use crate::model::EmbeddedData;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Global variables whose object-literal assignments are worth capturing.
const KNOWN_GLOBALS: &[&str] = &[
    "__NEXT_DATA__",
    "__INITIAL_STATE__",
    "__PRELOADED_STATE__",
    "__APP_CONFIG__",
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']?\b(eventId|buildId)\b["']?\s*[:=]\s*"#).unwrap())
}

/// Locates known embedded-JSON patterns in page script text.
///
/// Recognized patterns: the Next.js `__NEXT_DATA__` hydration payload,
/// assignments to well-known globals, and string/object values following
/// `eventId`/`buildId` tokens. A parse failure in one pattern is recorded
/// as absent and never aborts the others. Keys are unique per snapshot;
/// the first recognized occurrence wins.
pub fn extract_embedded(html: &str) -> Vec<EmbeddedData> {
    let document = Html::parse_document(html);
    let mut found: BTreeMap<String, Value> = BTreeMap::new();

    // Framework hydration payload carried in its own script tag.
    let next_data_selector = Selector::parse("script#__NEXT_DATA__").unwrap();
    if let Some(script) = document.select(&next_data_selector).next() {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(&raw) {
            Ok(payload) => {
                if let Some(build_id) = payload.get("buildId") {
                    found.insert("buildId".to_string(), build_id.clone());
                }
                if let Some(event_id) = hydration_event_id(&payload) {
                    found.insert("eventId".to_string(), event_id.clone());
                }
                found.insert("__NEXT_DATA__".to_string(), payload);
            }
            Err(e) => debug!("unparseable __NEXT_DATA__ payload: {}", e),
        }
    }

    // Everything else works on concatenated inline script text.
    let script_selector = Selector::parse("script").unwrap();
    let mut script_text = String::new();
    for script in document.select(&script_selector) {
        if script.value().attr("src").is_none() && script.value().attr("id") != Some("__NEXT_DATA__")
        {
            script_text.extend(script.text());
            script_text.push('\n');
        }
    }

    for global in KNOWN_GLOBALS {
        let assignment = format!("window.{} =", global);
        if let Some(idx) = script_text
            .find(&assignment)
            .or_else(|| script_text.find(&format!("window.{}=", global)))
        {
            let rest = script_text[idx..].splitn(2, '=').nth(1).unwrap_or("").trim_start();
            match object_literal(rest).map(serde_json::from_str::<Value>) {
                Some(Ok(value)) => {
                    found.entry(global.to_string()).or_insert(value);
                }
                Some(Err(e)) => debug!("skipping unparseable {} assignment: {}", global, e),
                None => {}
            }
        }
    }

    for caps in token_re().captures_iter(&script_text) {
        let key = caps.get(1).unwrap().as_str().to_string();
        if found.contains_key(&key) {
            continue;
        }
        let rest = &script_text[caps.get(0).unwrap().end()..];
        if let Some(value) = token_value(rest) {
            found.insert(key, value);
        }
    }

    found
        .into_iter()
        .map(|(key, value)| EmbeddedData::new(key, value))
        .collect()
}

/// The original flow identifier lives at props.pageProps.clientMetadata.eventId
/// in the hydration payload.
fn hydration_event_id(payload: &Value) -> Option<&Value> {
    payload
        .get("props")?
        .get("pageProps")?
        .get("clientMetadata")?
        .get("eventId")
}

/// Reads the value following an `eventId`/`buildId` token: a quoted string or
/// a JSON object literal. Anything else (including malformed JSON) is absent.
fn token_value(rest: &str) -> Option<Value> {
    let rest = rest.trim_start();
    let mut chars = rest.char_indices();
    match chars.next()? {
        (_, quote @ ('"' | '\'')) => {
            let end = rest[1..].find(quote)?;
            Some(Value::String(rest[1..1 + end].to_string()))
        }
        (_, '{') => {
            let literal = object_literal(rest)?;
            match serde_json::from_str::<Value>(literal) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("skipping unparseable object literal: {}", e);
                    None
                }
            }
        }
        _ => None,
    }
}

/// Returns the balanced `{ ... }` slice at the start of `text`, tolerant of
/// braces inside string literals.
fn object_literal(text: &str) -> Option<&str> {
    if !text.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => in_string = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}
