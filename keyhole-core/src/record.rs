use chrono::{DateTime, Utc};
use keyhole_extract::{AuthenticationProfile, DiscoveredEndpoint, EmbeddedData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// The persisted unit of knowledge for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub last_updated: DateTime<Utc>,
    pub discovery_count: u64,
    pub endpoints: Vec<DiscoveredEndpoint>,
    pub authentication: Option<AuthenticationProfile>,
    pub javascript_data: BTreeMap<String, Value>,
}

impl DomainRecord {
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            last_updated: Utc::now(),
            discovery_count: 0,
            endpoints: Vec::new(),
            authentication: None,
            javascript_data: BTreeMap::new(),
        }
    }

    /// Folds one discovery run into the record and returns the endpoints that
    /// were new to this domain.
    ///
    /// Endpoints union by (url, method); a duplicate only moves its
    /// `discovered_at` forward, never back. Authentication follows confidence
    /// monotonicity: an unknown profile never displaces a specific one.
    /// Embedded data overwrites per key, reflecting the latest page snapshot.
    pub fn absorb(
        &mut self,
        endpoints: Vec<DiscoveredEndpoint>,
        authentication: AuthenticationProfile,
        javascript_data: Vec<EmbeddedData>,
    ) -> Vec<DiscoveredEndpoint> {
        let mut added = Vec::new();

        for endpoint in endpoints {
            match self
                .endpoints
                .iter_mut()
                .find(|e| e.identity() == endpoint.identity())
            {
                Some(existing) => {
                    if endpoint.discovered_at > existing.discovered_at {
                        existing.discovered_at = endpoint.discovered_at;
                    }
                }
                None => {
                    added.push(endpoint.clone());
                    self.endpoints.push(endpoint);
                }
            }
        }

        let keep_prior = authentication.is_unknown()
            && self
                .authentication
                .as_ref()
                .is_some_and(|prior| !prior.is_unknown());
        if !keep_prior {
            self.authentication = Some(authentication);
        }

        for data in javascript_data {
            self.javascript_data.insert(data.key, data.value);
        }

        self.discovery_count += 1;
        self.last_updated = Utc::now();

        added
    }
}

/// Result of one `discover` run: the post-merge record plus the endpoints
/// first seen during this run.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub record: DomainRecord,
    pub new_endpoints: Vec<DiscoveredEndpoint>,
}

/// Derives the knowledge-base partition key from a URL: the lowercased host
/// with any `www.` prefix stripped, plus an explicit non-default port.
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown").to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
