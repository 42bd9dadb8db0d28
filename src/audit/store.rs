//! Audit stores
//!
//! - Append-only: records are inserted, never updated
//! - A record is visible to `query` once `insert` returns
//! - The file store syncs every write before acknowledging, off the async
//!   worker threads

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::AuditResult;
use super::record::AuditRecord;

/// Persistent sink for audit records
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one record. Durable once this returns.
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()>;

    /// Every record, oldest first
    async fn query(&self) -> AuditResult<Vec<AuditRecord>>;

    async fn fetch(&self, id: Uuid) -> AuditResult<Option<AuditRecord>> {
        Ok(self.query().await?.into_iter().find(|r| r.id == id))
    }

    /// Short backend name for logs
    fn kind(&self) -> &'static str;
}

/// File-based audit store.
///
/// One JSON record per line, fsync after each write.
pub struct FileAuditStore {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileAuditStore {
    /// Open or create an audit file
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        let line = record.to_json_line()?;
        let writer = Arc::clone(&self.writer);
        run_blocking(move || {
            let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
            writeln!(writer, "{}", line)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        })
        .await
    }

    async fn query(&self) -> AuditResult<Vec<AuditRecord>> {
        let path = self.path.clone();
        let content = run_blocking(move || Ok(fs::read_to_string(path)?)).await?;
        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

/// Run file I/O on the blocking pool
async fn run_blocking<T, F>(f: F) -> AuditResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AuditResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// In-memory audit store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditStore {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    async fn query(&self) -> AuditResult<Vec<AuditRecord>> {
        Ok(self.records())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
