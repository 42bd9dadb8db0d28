//! # Service Configuration
//!
//! Settings come from `KEY=VALUE` pairs: an optional env file overlaid by
//! the process environment. [`ServiceConfig::from_kv`] does all parsing so
//! tests can feed a plain map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::access::AccessMap;
use crate::audit::{AuditError, AuditStore, FileAuditStore, MemoryAuditStore, PgAuditConfig, PgAuditStore};
use crate::http_server::HttpServerConfig;
use crate::observability::{LogFormat, MetricsRegistry};
use crate::provisioning::{ProvisionOptions, Provisioner};
use crate::remote::{ClientConfig, RemoteCallClient, ReqwestTransport, RetryPolicy, TransportError};

/// Env var naming the env file read by [`ServiceConfig::load`]
pub const ENV_FILE_VAR: &str = "PROVISIONER_ENV_FILE";

const MAX_RETRIES: u32 = 10;
const DEFAULT_AUDIT_FILE: &str = "audit/metadata.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line} in {path} ({reason})")]
    FileParse {
        path: PathBuf,
        line: usize,
        reason: &'static str,
    },

    #[error("failed to load access map from {path}: {source}")]
    AccessMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "ERR_CONFIG_MISSING",
            ConfigError::Invalid { .. } => "ERR_INVALID_CONFIG",
            ConfigError::FileRead { .. } => "ERR_CONFIG_FILE_READ",
            ConfigError::FileParse { .. } => "ERR_CONFIG_FILE_PARSE",
            ConfigError::AccessMap { .. } => "ERR_ACCESS_MAP",
            ConfigError::Transport(_) => "ERR_TRANSPORT",
            ConfigError::Audit(_) => "ERR_AUDIT_STORE",
        }
    }
}

/// Where audit records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditBackend {
    Memory,
    File(PathBuf),
    Postgres(PgAuditConfig),
}

impl AuditBackend {
    pub fn name(&self) -> &'static str {
        match self {
            AuditBackend::Memory => "memory",
            AuditBackend::File(_) => "file",
            AuditBackend::Postgres(_) => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub remote: ClientConfig,
    pub warehouse_id: Option<String>,
    pub access_map_path: Option<PathBuf>,
    pub ensure_groups: bool,
    pub snapshot_poll: Duration,
    pub snapshot_max_wait: Duration,
    pub audit: AuditBackend,
    pub server: HttpServerConfig,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Merge `env_file` (or `$PROVISIONER_ENV_FILE`) with the process
    /// environment; the environment wins.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = HashMap::new();

        let from_var = std::env::var(ENV_FILE_VAR)
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if let Some(path) = env_file.map(Path::to_path_buf).or(from_var) {
            merged.extend(parse_env_file(&path)?);
        }

        merged.extend(std::env::vars());

        Self::from_kv(&merged)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = require_nonempty(kv, "DATABRICKS_HOST")?;
        let token = require_nonempty(kv, "DATABRICKS_TOKEN")?;

        let timeout = parse_u64(kv.get("REMOTE_TIMEOUT_SECS"), 30, "REMOTE_TIMEOUT_SECS")?;
        let retries = parse_u32(kv.get("REMOTE_RETRIES"), 3, "REMOTE_RETRIES")?;
        if retries == 0 || retries > MAX_RETRIES {
            return Err(ConfigError::Invalid {
                key: "REMOTE_RETRIES",
                message: format!("must be between 1 and {}", MAX_RETRIES),
            });
        }
        let backoff = parse_u64(kv.get("REMOTE_BACKOFF_SECS"), 2, "REMOTE_BACKOFF_SECS")?;

        let mut remote = ClientConfig::new(host, token)
            .with_timeout(Duration::from_secs(timeout))
            .with_retry(RetryPolicy::new(retries, Duration::from_secs(backoff)));
        if let Some(account_id) = optional(kv, "DATABRICKS_ACCOUNT_ID") {
            remote = remote.with_account_id(account_id);
        }

        let ensure_groups = match kv.get("ENSURE_GROUPS") {
            None => false,
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::Invalid {
                key: "ENSURE_GROUPS",
                message: format!("expected a boolean, got '{}'", value),
            })?,
        };
        if ensure_groups && remote.account_id.is_none() {
            return Err(ConfigError::Missing("DATABRICKS_ACCOUNT_ID"));
        }

        let snapshot_poll = parse_u64(kv.get("SNAPSHOT_POLL_SECS"), 3, "SNAPSHOT_POLL_SECS")?;
        if snapshot_poll == 0 {
            return Err(ConfigError::Invalid {
                key: "SNAPSHOT_POLL_SECS",
                message: "must be >= 1".to_string(),
            });
        }
        let snapshot_max_wait =
            parse_u64(kv.get("SNAPSHOT_MAX_WAIT_SECS"), 600, "SNAPSHOT_MAX_WAIT_SECS")?;

        let log_format = match kv.get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                key: "LOG_FORMAT",
                message,
            })?,
        };

        let mut server = HttpServerConfig::default();
        if let Some(host) = optional(kv, "SERVICE_HOST") {
            server.host = host;
        }
        server.port = parse_u16(kv.get("SERVICE_PORT"), server.port, "SERVICE_PORT")?;
        if let Some(origins) = kv.get("CORS_ORIGINS") {
            server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(Self {
            remote,
            warehouse_id: optional(kv, "DATABRICKS_WAREHOUSE_ID"),
            access_map_path: optional(kv, "ACCESS_MAP_PATH").map(PathBuf::from),
            ensure_groups,
            snapshot_poll: Duration::from_secs(snapshot_poll),
            snapshot_max_wait: Duration::from_secs(snapshot_max_wait),
            audit: parse_audit_backend(kv)?,
            server,
            log_format,
        })
    }

    /// The configured access map, or the built-in table
    pub fn access_map(&self) -> Result<AccessMap, ConfigError> {
        let map = match &self.access_map_path {
            None => AccessMap::default(),
            Some(path) => AccessMap::load(path).map_err(|source| ConfigError::AccessMap {
                path: path.clone(),
                source,
            })?,
        };
        tracing::info!(
            levels = ?map.levels().collect::<Vec<_>>(),
            custom = self.access_map_path.is_some(),
            "access map loaded"
        );
        Ok(map)
    }

    pub fn provision_options(&self) -> ProvisionOptions {
        ProvisionOptions {
            ensure_groups: self.ensure_groups,
            warehouse_id: self.warehouse_id.clone(),
            snapshot_poll: self.snapshot_poll,
            snapshot_max_wait: self.snapshot_max_wait,
        }
    }

    /// Provisioner over the real HTTP transport
    pub fn build_provisioner(&self, metrics: Arc<MetricsRegistry>) -> Result<Provisioner, ConfigError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let client = RemoteCallClient::with_metrics(self.remote.clone(), transport, metrics.clone());
        Ok(Provisioner::new(client, Arc::new(self.access_map()?))
            .with_options(self.provision_options())
            .with_metrics(metrics))
    }

    pub async fn build_audit_store(&self) -> Result<Arc<dyn AuditStore>, ConfigError> {
        let store: Arc<dyn AuditStore> = match &self.audit {
            AuditBackend::Memory => Arc::new(MemoryAuditStore::new()),
            AuditBackend::File(path) => Arc::new(FileAuditStore::open(path)?),
            AuditBackend::Postgres(pg) => Arc::new(PgAuditStore::connect(pg).await?),
        };
        Ok(store)
    }
}

fn parse_audit_backend(kv: &HashMap<String, String>) -> Result<AuditBackend, ConfigError> {
    let kind = kv
        .get("AUDIT_STORE")
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "memory".to_string());

    match kind.as_str() {
        "" | "memory" => Ok(AuditBackend::Memory),
        "file" => Ok(AuditBackend::File(
            optional(kv, "AUDIT_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_FILE)),
        )),
        "postgres" => Ok(AuditBackend::Postgres(PgAuditConfig {
            host: require_nonempty(kv, "LAKEBASE_HOST")?,
            port: parse_u16(kv.get("LAKEBASE_PORT"), 5432, "LAKEBASE_PORT")?,
            database: require_nonempty(kv, "LAKEBASE_DB_NAME")?,
            user: require_nonempty(kv, "LAKEBASE_USER")?,
            password: require_nonempty(kv, "LAKEBASE_OAUTH_TOKEN")?,
            ..PgAuditConfig::default()
        })),
        other => Err(ConfigError::Invalid {
            key: "AUDIT_STORE",
            message: format!("unknown audit store '{}' (expected memory, file or postgres)", other),
        }),
    }
}

/// Parse `KEY=VALUE` lines; `#` comments and blank lines are skipped
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut kv = HashMap::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let (key, value) = line.split_once('=').ok_or(ConfigError::FileParse {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: "expected KEY=VALUE",
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::FileParse {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: "empty key",
            });
        }
        kv.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    Ok(kv)
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn optional(kv: &HashMap<String, String>, key: &str) -> Option<String> {
    kv.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn require_nonempty(kv: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    optional(kv, key).ok_or(ConfigError::Missing(key))
}

fn parse_u64(value: Option<&String>, default: u64, key: &'static str) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            message: format!("expected an unsigned integer, got '{}'", v),
        }),
    }
}

fn parse_u32(value: Option<&String>, default: u32, key: &'static str) -> Result<u32, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            message: format!("expected an unsigned integer, got '{}'", v),
        }),
    }
}

fn parse_u16(value: Option<&String>, default: u16, key: &'static str) -> Result<u16, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            message: format!("expected a port number, got '{}'", v),
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessMapper;
    use tempfile::tempdir;

    fn base_kv() -> HashMap<String, String> {
        HashMap::from([
            ("DATABRICKS_HOST".to_string(), "https://adb.example.net/".to_string()),
            ("DATABRICKS_TOKEN".to_string(), "dapi-123".to_string()),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_kv(&base_kv()).unwrap();

        assert_eq!(config.remote.timeout, Duration::from_secs(30));
        assert_eq!(config.remote.retry.retries, 3);
        assert_eq!(config.remote.retry.backoff, Duration::from_secs(2));
        assert_eq!(config.remote.account_id, None);
        assert!(!config.ensure_groups);
        assert_eq!(config.snapshot_poll, Duration::from_secs(3));
        assert_eq!(config.snapshot_max_wait, Duration::from_secs(600));
        assert_eq!(config.audit, AuditBackend::Memory);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_host() {
        let mut kv = base_kv();
        kv.remove("DATABRICKS_HOST");
        let err = ServiceConfig::from_kv(&kv).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABRICKS_HOST")));
        assert_eq!(err.code(), "ERR_CONFIG_MISSING");
    }

    #[test]
    fn test_retry_bounds() {
        let mut kv = base_kv();
        kv.insert("REMOTE_RETRIES".into(), "0".into());
        assert!(matches!(
            ServiceConfig::from_kv(&kv),
            Err(ConfigError::Invalid { key: "REMOTE_RETRIES", .. })
        ));

        kv.insert("REMOTE_RETRIES".into(), "11".into());
        assert!(ServiceConfig::from_kv(&kv).is_err());

        kv.insert("REMOTE_RETRIES".into(), "5".into());
        assert_eq!(ServiceConfig::from_kv(&kv).unwrap().remote.retry.retries, 5);
    }

    #[test]
    fn test_ensure_groups_requires_account() {
        let mut kv = base_kv();
        kv.insert("ENSURE_GROUPS".into(), "true".into());
        assert!(matches!(
            ServiceConfig::from_kv(&kv),
            Err(ConfigError::Missing("DATABRICKS_ACCOUNT_ID"))
        ));

        kv.insert("DATABRICKS_ACCOUNT_ID".into(), "acc-1".into());
        let config = ServiceConfig::from_kv(&kv).unwrap();
        assert!(config.ensure_groups);
        assert_eq!(config.remote.account_id.as_deref(), Some("acc-1"));
    }

    #[test]
    fn test_postgres_backend() {
        let mut kv = base_kv();
        kv.insert("AUDIT_STORE".into(), "postgres".into());
        assert!(matches!(
            ServiceConfig::from_kv(&kv),
            Err(ConfigError::Missing("LAKEBASE_HOST"))
        ));

        kv.insert("LAKEBASE_HOST".into(), "db.example.net".into());
        kv.insert("LAKEBASE_DB_NAME".into(), "audit".into());
        kv.insert("LAKEBASE_USER".into(), "svc".into());
        kv.insert("LAKEBASE_OAUTH_TOKEN".into(), "secret".into());
        match ServiceConfig::from_kv(&kv).unwrap().audit {
            AuditBackend::Postgres(pg) => {
                assert_eq!(pg.host, "db.example.net");
                assert_eq!(pg.port, 5432);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_unknown_backend() {
        let mut kv = base_kv();
        kv.insert("AUDIT_STORE".into(), "s3".into());
        assert!(ServiceConfig::from_kv(&kv).is_err());
    }

    #[test]
    fn test_cors_origins_split() {
        let mut kv = base_kv();
        kv.insert("CORS_ORIGINS".into(), "https://a.example, https://b.example,".into());
        let config = ServiceConfig::from_kv(&kv).unwrap();
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_parse_env_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("provisioner.env");
        std::fs::write(
            &path,
            "# workspace\nDATABRICKS_HOST=\"https://adb.example.net\"\nexport DATABRICKS_TOKEN='dapi-1'\n\nREMOTE_RETRIES = 4\n",
        )
        .unwrap();

        let kv = parse_env_file(&path).unwrap();
        assert_eq!(kv["DATABRICKS_HOST"], "https://adb.example.net");
        assert_eq!(kv["DATABRICKS_TOKEN"], "dapi-1");
        assert_eq!(kv["REMOTE_RETRIES"], "4");
    }

    #[test]
    fn test_parse_env_file_rejects_bad_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.env");
        std::fs::write(&path, "DATABRICKS_HOST=x\nnot a pair\n").unwrap();

        match parse_env_file(&path) {
            Err(ConfigError::FileParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_access_map_default_and_file() {
        let config = ServiceConfig::from_kv(&base_kv()).unwrap();
        assert_eq!(config.access_map().unwrap(), AccessMap::default());

        let dir = tempdir().unwrap();
        let path = dir.path().join("access.json");
        std::fs::write(&path, r#"{"viewer": ["SELECT"]}"#).unwrap();
        let mut kv = base_kv();
        kv.insert("ACCESS_MAP_PATH".into(), path.display().to_string());
        let map = ServiceConfig::from_kv(&kv).unwrap().access_map().unwrap();
        assert_eq!(map.levels().collect::<Vec<_>>(), vec!["viewer"]);
        assert_eq!(map.resolve("viewer"), ["SELECT"]);
    }
}
