//! Process configuration, read once from the environment at start-up.

use std::{env, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
  pub server: ServerConfig,
  pub database: DatabaseConfig,
  pub storage: StorageConfig,
  pub ingest: IngestConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub bind_addr: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
  pub url: String,
  pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub enum StorageConfig {
  S3(S3Config),
  Local { base_dir: String, public_base_url: Option<String> },
}

#[derive(Clone, Debug)]
pub struct S3Config {
  pub bucket: String,
  pub region: String,
  pub endpoint: Option<String>,
  pub access_key_id: Option<String>,
  pub secret_access_key: Option<String>,
  pub force_path_style: bool,
  pub public_base_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
  /// Parse and persist while walking the bucket.
  Eager,
  /// Copy raw objects into the staging table first, process them afterwards.
  Staged,
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
  pub mode: SyncMode,
  pub prefix: String,
  pub attachment_prefix: String,
  pub quarantine_prefix: String,
  pub interval: Duration,
  pub call_timeout: Duration,
  pub retention_cap: i64,
  pub page_size: i32,
  /// 0 disables quarantining.
  pub max_parse_attempts: i64,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      mode: SyncMode::Eager,
      prefix: String::new(),
      attachment_prefix: "attachments".to_string(),
      quarantine_prefix: "quarantine/".to_string(),
      interval: Duration::from_secs(4),
      call_timeout: Duration::from_secs(30),
      retention_cap: 10,
      page_size: 1000,
      max_parse_attempts: 5,
    }
  }
}

impl Config {
  pub fn from_env() -> Self {
    let server = ServerConfig {
      bind_addr: env_var("WEBMAIL_ADDR", "127.0.0.1:8000"),
    };

    let database = DatabaseConfig {
      url: env_var("WEBMAIL_DATABASE", "sqlite://webmail.db"),
      max_connections: env_parse("WEBMAIL_DB_MAX_CONNECTIONS", 5u32),
    };

    let defaults = IngestConfig::default();
    let ingest = IngestConfig {
      mode: match env_var("SYNC_MODE", "eager").trim().to_ascii_lowercase().as_str() {
        "staged" | "two-phase" => SyncMode::Staged,
        _ => SyncMode::Eager,
      },
      prefix: env_var("S3_PREFIX", ""),
      attachment_prefix: env_var("ATTACHMENT_PREFIX", &defaults.attachment_prefix),
      quarantine_prefix: env_var("QUARANTINE_PREFIX", &defaults.quarantine_prefix),
      interval: Duration::from_secs(env_parse("SYNC_INTERVAL_SECS", 4u64).max(1)),
      call_timeout: Duration::from_secs(env_parse("CALL_TIMEOUT_SECS", 30u64).max(1)),
      retention_cap: env_parse("INBOX_RETENTION_CAP", defaults.retention_cap).max(1),
      page_size: env_parse("LIST_PAGE_SIZE", defaults.page_size).clamp(1, 1000),
      max_parse_attempts: env_parse("MAX_PARSE_ATTEMPTS", defaults.max_parse_attempts).max(0),
    };

    Self {
      server,
      database,
      storage: load_storage_from_env(),
      ingest,
    }
  }
}

fn load_storage_from_env() -> StorageConfig {
  let public_base_url = env_opt("PUBLIC_BASE_URL");
  let Some(bucket) = env_opt("S3_BUCKET") else {
    return StorageConfig::Local {
      base_dir: env_var("INBOX_INCOMING_DIR", "data/incoming"),
      public_base_url,
    };
  };

  StorageConfig::S3(S3Config {
    bucket,
    region: env_opt("S3_REGION")
      .or_else(|| env_opt("AWS_REGION"))
      .unwrap_or_else(|| "us-east-1".to_string()),
    endpoint: env_opt("S3_ENDPOINT"),
    access_key_id: env_opt("S3_ACCESS_KEY_ID"),
    secret_access_key: env_opt("S3_SECRET_ACCESS_KEY"),
    force_path_style: env_parse_bool("S3_FORCE_PATH_STYLE", false),
    public_base_url,
  })
}

fn env_var(key: &str, fallback: &str) -> String {
  env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn env_opt(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
  env::var(key)
    .ok()
    .and_then(|v| v.trim().parse::<T>().ok())
    .unwrap_or(fallback)
}

fn env_parse_bool(key: &str, fallback: bool) -> bool {
  env::var(key)
    .ok()
    .map(|v| {
      matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
      )
    })
    .unwrap_or(fallback)
}
