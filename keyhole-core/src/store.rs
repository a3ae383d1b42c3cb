use crate::error::StoreError;
use crate::record::DomainRecord;
use keyhole_extract::{AuthenticationProfile, DiscoveredEndpoint, EmbeddedData};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Durable per-domain knowledge base.
///
/// One JSON file per domain under `cache_dir`. Merges for the same domain are
/// serialized by a per-domain lock held across the whole load-mutate-write;
/// merges for different domains run concurrently. Files are replaced
/// atomically (write to a temp file, then rename), so readers never observe
/// a torn record and a crash mid-write leaves the previous committed state.
pub struct KnowledgeStore {
    cache_dir: PathBuf,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KnowledgeStore {
    /// Opens (and creates if needed) a store rooted at `cache_dir`. The
    /// directory is an explicit constructor argument so separate store
    /// instances never share ambient state.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn domain_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(domain.to_string()).or_default().clone()
    }

    /// Domains are filesystem-safe except for the port separator.
    fn record_path(&self, domain: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", domain.replace(':', "_")))
    }

    /// Loads the committed record for a domain. A missing record is `None`;
    /// only real I/O failure or on-disk corruption is an error.
    pub async fn load(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        let lock = self.domain_lock(domain);
        let _guard = lock.lock().await;
        self.read_record(domain)
    }

    /// Read-only copy of the committed record. Never bumps `discovery_count`.
    pub async fn snapshot(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        self.load(domain).await
    }

    /// Folds one discovery run into the domain's record, creating it on first
    /// contact. Returns the post-merge record and the endpoints newly seen by
    /// this call. Atomic with respect to concurrent merges on the same
    /// domain: both contributions survive.
    pub async fn merge(
        &self,
        domain: &str,
        endpoints: Vec<DiscoveredEndpoint>,
        authentication: AuthenticationProfile,
        javascript_data: Vec<EmbeddedData>,
    ) -> Result<(DomainRecord, Vec<DiscoveredEndpoint>), StoreError> {
        let lock = self.domain_lock(domain);
        let _guard = lock.lock().await;

        let mut record = self
            .read_record(domain)?
            .unwrap_or_else(|| DomainRecord::new(domain.to_string()));

        let added = record.absorb(endpoints, authentication, javascript_data);
        self.write_record(&record)?;

        info!(
            "merged discovery run {} for {}: {} endpoints total, {} new",
            record.discovery_count,
            domain,
            record.endpoints.len(),
            added.len()
        );
        Ok((record, added))
    }

    /// Administrative removal of a domain's record. Returns whether a record
    /// existed.
    pub async fn purge(&self, domain: &str) -> Result<bool, StoreError> {
        let lock = self.domain_lock(domain);
        let _guard = lock.lock().await;

        match fs::remove_file(self.record_path(domain)) {
            Ok(()) => {
                info!("purged knowledge for {}", domain);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Domains with a committed record, in file order.
    pub fn domains(&self) -> Result<Vec<String>, StoreError> {
        let mut domains = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                domains.push(stem.replace('_', ":"));
            }
        }
        domains.sort();
        Ok(domains)
    }

    fn read_record(&self, domain: &str) -> Result<Option<DomainRecord>, StoreError> {
        let path = self.record_path(domain);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            domain: domain.to_string(),
            source,
        })?;
        Ok(Some(record))
    }

    fn write_record(&self, record: &DomainRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.domain);
        let tmp = NamedTempFile::new_in(&self.cache_dir)?;
        serde_json::to_writer_pretty(&tmp, record).map_err(std::io::Error::other)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("committed {}", path.display());
        Ok(())
    }
}
