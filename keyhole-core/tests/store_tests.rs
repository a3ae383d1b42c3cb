// Tests for the per-domain knowledge store

use keyhole_core::{KnowledgeStore, StoreError};
use keyhole_extract::{
    AuthScheme, AuthenticationProfile, DiscoveredEndpoint, EmbeddedData, EndpointSource,
    HttpMethod,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_store() -> (TempDir, KnowledgeStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = KnowledgeStore::new(temp_dir.path().join("cache")).unwrap();
    (temp_dir, store)
}

fn endpoint(url: &str, method: HttpMethod) -> DiscoveredEndpoint {
    DiscoveredEndpoint::new(url.to_string(), method, EndpointSource::Anchor)
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_store_creation_makes_cache_dir() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("nested").join("cache");

    let store = KnowledgeStore::new(&cache_dir).unwrap();
    assert!(cache_dir.is_dir());
    assert_eq!(store.cache_dir(), cache_dir);
}

#[tokio::test]
async fn test_missing_record_loads_as_none() {
    let (_temp_dir, store) = create_test_store();

    let record = store.load("example.com").await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_merge_then_load_round_trip() {
    let (_temp_dir, store) = create_test_store();

    let ep = endpoint("https://example.com/api/v2/users", HttpMethod::Get);
    let data = vec![EmbeddedData::new("buildId", serde_json::json!("abc"))];
    let (written, new) = store
        .merge("example.com", vec![ep], AuthenticationProfile::unknown(), data)
        .await
        .unwrap();

    assert_eq!(new.len(), 1);
    assert_eq!(written.discovery_count, 1);

    let loaded = store.load("example.com").await.unwrap().unwrap();
    assert_eq!(loaded, written);
    assert_eq!(loaded.javascript_data["buildId"], serde_json::json!("abc"));
}

#[tokio::test]
async fn test_record_survives_store_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");

    {
        let store = KnowledgeStore::new(&cache_dir).unwrap();
        store
            .merge(
                "example.com",
                vec![endpoint("https://example.com/api/items", HttpMethod::Get)],
                AuthenticationProfile::unknown(),
                vec![],
            )
            .await
            .unwrap();
    }

    let store = KnowledgeStore::new(&cache_dir).unwrap();
    let loaded = store.load("example.com").await.unwrap().unwrap();
    assert_eq!(loaded.endpoints.len(), 1);
    assert_eq!(loaded.discovery_count, 1);
}

#[tokio::test]
async fn test_domain_with_port_gets_its_own_file() {
    let (_temp_dir, store) = create_test_store();

    store
        .merge(
            "localhost:8080",
            vec![endpoint("http://localhost:8080/api/x", HttpMethod::Get)],
            AuthenticationProfile::unknown(),
            vec![],
        )
        .await
        .unwrap();

    assert!(store.cache_dir().join("localhost_8080.json").is_file());
    assert_eq!(store.domains().unwrap(), vec!["localhost:8080".to_string()]);
}

// ============================================================================
// Merge Law Tests
// ============================================================================

#[tokio::test]
async fn test_merge_unions_endpoints_by_identity() {
    let (_temp_dir, store) = create_test_store();

    store
        .merge(
            "example.com",
            vec![
                endpoint("https://example.com/api/a", HttpMethod::Get),
                endpoint("https://example.com/api/b", HttpMethod::Get),
            ],
            AuthenticationProfile::unknown(),
            vec![],
        )
        .await
        .unwrap();

    // Second run overlaps on /api/a and contributes /api/c. Same URL with a
    // different verb is a distinct endpoint.
    let (record, new) = store
        .merge(
            "example.com",
            vec![
                endpoint("https://example.com/api/a", HttpMethod::Get),
                endpoint("https://example.com/api/a", HttpMethod::Post),
                endpoint("https://example.com/api/c", HttpMethod::Get),
            ],
            AuthenticationProfile::unknown(),
            vec![],
        )
        .await
        .unwrap();

    assert_eq!(record.endpoints.len(), 4);
    assert_eq!(new.len(), 2);
    assert_eq!(record.discovery_count, 2);
}

#[tokio::test]
async fn test_unknown_auth_never_displaces_specific() {
    let (_temp_dir, store) = create_test_store();

    let specific = AuthenticationProfile {
        scheme: AuthScheme::FormBased,
        login_endpoint: Some("https://example.com/login".to_string()),
        ..AuthenticationProfile::unknown()
    };
    store
        .merge("example.com", vec![], specific.clone(), vec![])
        .await
        .unwrap();

    let (record, _) = store
        .merge("example.com", vec![], AuthenticationProfile::unknown(), vec![])
        .await
        .unwrap();

    assert_eq!(record.authentication, Some(specific));
}

#[tokio::test]
async fn test_embedded_data_latest_snapshot_wins() {
    let (_temp_dir, store) = create_test_store();

    store
        .merge(
            "example.com",
            vec![],
            AuthenticationProfile::unknown(),
            vec![EmbeddedData::new("buildId", serde_json::json!("v1"))],
        )
        .await
        .unwrap();

    let (record, _) = store
        .merge(
            "example.com",
            vec![],
            AuthenticationProfile::unknown(),
            vec![EmbeddedData::new("buildId", serde_json::json!("v2"))],
        )
        .await
        .unwrap();

    assert_eq!(record.javascript_data["buildId"], serde_json::json!("v2"));
}

#[tokio::test]
async fn test_snapshot_never_bumps_discovery_count() {
    let (_temp_dir, store) = create_test_store();

    store
        .merge(
            "example.com",
            vec![endpoint("https://example.com/api/a", HttpMethod::Get)],
            AuthenticationProfile::unknown(),
            vec![],
        )
        .await
        .unwrap();

    for _ in 0..3 {
        store.snapshot("example.com").await.unwrap();
    }

    let record = store.load("example.com").await.unwrap().unwrap();
    assert_eq!(record.discovery_count, 1);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_merges_on_same_domain_both_survive() {
    let (_temp_dir, store) = create_test_store();
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .merge(
                    "example.com",
                    vec![endpoint(
                        &format!("https://example.com/api/{}", i),
                        HttpMethod::Get,
                    )],
                    AuthenticationProfile::unknown(),
                    vec![],
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record = store.load("example.com").await.unwrap().unwrap();
    assert_eq!(record.endpoints.len(), 8);
    assert_eq!(record.discovery_count, 8);
}

#[tokio::test]
async fn test_concurrent_merges_on_different_domains() {
    let (_temp_dir, store) = create_test_store();
    let store = Arc::new(store);

    let domains = ["a.example.com", "b.example.com", "c.example.com"];
    let mut handles = Vec::new();
    for domain in domains {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .merge(
                    domain,
                    vec![endpoint(
                        &format!("https://{}/api/items", domain),
                        HttpMethod::Get,
                    )],
                    AuthenticationProfile::unknown(),
                    vec![],
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut listed = store.domains().unwrap();
    listed.sort();
    assert_eq!(listed, domains);
}

// ============================================================================
// Failure and Administration Tests
// ============================================================================

#[tokio::test]
async fn test_corrupt_record_surfaces_as_error() {
    let (_temp_dir, store) = create_test_store();

    fs::write(store.cache_dir().join("example.com.json"), "{not json").unwrap();

    let err = store.load("example.com").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref domain, .. } if domain == "example.com"));
}

#[tokio::test]
async fn test_purge_removes_record() {
    let (_temp_dir, store) = create_test_store();

    store
        .merge(
            "example.com",
            vec![endpoint("https://example.com/api/a", HttpMethod::Get)],
            AuthenticationProfile::unknown(),
            vec![],
        )
        .await
        .unwrap();

    assert!(store.purge("example.com").await.unwrap());
    assert!(store.load("example.com").await.unwrap().is_none());
    assert!(!store.purge("example.com").await.unwrap());
}
