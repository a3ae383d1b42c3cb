use crate::record::DomainRecord;
use keyhole_extract::{DiscoveredEndpoint, EndpointSource};
use std::collections::HashMap;

/// Render a domain's knowledge as a text report, optionally highlighting the
/// endpoints first seen in the current run.
pub fn generate_domain_report(
    record: &DomainRecord,
    new_endpoints: Option<&[DiscoveredEndpoint]>,
) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str(&format!("# {}\n", record.domain));
    report.push_str(&format!("  Discovery runs: {}\n", record.discovery_count));
    report.push_str(&format!(
        "  Last updated: {}\n",
        record.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("  Known endpoints: {}\n", record.endpoints.len()));
    if let Some(new) = new_endpoints {
        report.push_str(&format!("  New this run: {}\n", new.len()));
    }

    report.push_str("\n## Authentication\n");
    match &record.authentication {
        Some(auth) => {
            report.push_str(&format!("  Scheme: {}\n", auth.scheme.as_str()));
            if let Some(endpoint) = &auth.login_endpoint {
                report.push_str(&format!("  Login endpoint: {}\n", endpoint));
            }
            if let Some(fallback) = &auth.fallback_endpoint {
                report.push_str(&format!("  Fallback endpoint: {}\n", fallback));
            }
            if let Some(event_id) = &auth.event_id {
                report.push_str(&format!("  Event id: {}\n", event_id));
            }
            if auth.csrf_token.is_some() {
                report.push_str("  CSRF token: present\n");
            }
            for (role, field) in &auth.fields {
                report.push_str(&format!("  Field '{}': {}\n", role, field));
            }
        }
        None => report.push_str("  Scheme: unknown\n"),
    }

    // Group endpoints by where they were found, forms first.
    let mut by_source: HashMap<EndpointSource, Vec<&DiscoveredEndpoint>> = HashMap::new();
    for endpoint in &record.endpoints {
        by_source.entry(endpoint.source).or_default().push(endpoint);
    }

    report.push_str("\n## Endpoints\n");
    for source in [
        EndpointSource::Form,
        EndpointSource::Anchor,
        EndpointSource::ScriptLiteral,
    ] {
        let Some(endpoints) = by_source.get(&source) else {
            continue;
        };
        report.push_str(&format!("\n  {} ({})\n", source.as_str(), endpoints.len()));
        for endpoint in endpoints {
            let marker = match new_endpoints {
                Some(new) if new.iter().any(|n| n.identity() == endpoint.identity()) => "+",
                _ => " ",
            };
            report.push_str(&format!(
                "  {} {:7} {}\n",
                marker,
                endpoint.method.as_str(),
                endpoint.url
            ));
        }
    }

    if !record.javascript_data.is_empty() {
        report.push_str("\n## Embedded data\n");
        for key in record.javascript_data.keys() {
            report.push_str(&format!("  - {}\n", key));
        }
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
