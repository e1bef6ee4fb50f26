use anyhow::Result;
use dotenvy::dotenv;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub mod registry;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Where filings, challans and payments are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            other => anyhow::bail!("STORAGE must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        }
    }
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub storage: StorageKind,
    pub database_max_connections: u32,
    pub registry_path: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: AllowedOrigins,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let storage: StorageKind = env_or("STORAGE", "postgres").parse()?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if storage == StorageKind::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORAGE=postgres");
        }

        Ok(Config {
            server_port: env_or("SERVER_PORT", "3000").parse()?,
            database_url,
            storage,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", "5").parse()?,
            registry_path: PathBuf::from(env_or("REGISTRY_PATH", "config/annexures.json")),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse()?,
            cors_allowed_origins: parse_allowed_origins(&env_or("CORS_ALLOWED_ORIGINS", "*"))?,
            log_format: env_or("LOG_FORMAT", "text").parse()?,
        })
    }

    /// Settings for tests and `STORAGE=memory` runs.
    pub fn in_memory() -> Self {
        Config {
            server_port: 3000,
            database_url: None,
            storage: StorageKind::Memory,
            database_max_connections: 5,
            registry_path: PathBuf::from("config/annexures.json"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_allowed_origins: AllowedOrigins::Any,
            log_format: LogFormat::Text,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_allowed_origins(raw: &str) -> anyhow::Result<AllowedOrigins> {
    let value = raw.trim();
    if value == "*" {
        return Ok(AllowedOrigins::Any);
    }

    let origins: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS must be '*' or a comma-separated list of origins");
    }

    Ok(AllowedOrigins::List(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_origin_lists() {
        assert_eq!(parse_allowed_origins("*").unwrap(), AllowedOrigins::Any);
        assert_eq!(
            parse_allowed_origins("http://a.test, http://b.test").unwrap(),
            AllowedOrigins::List(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        assert!(parse_allowed_origins(" , ").is_err());
    }

    #[test]
    fn parses_storage_and_log_format() {
        assert_eq!("Memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("postgres".parse::<StorageKind>().unwrap(), StorageKind::Postgres);
        assert!("mongo".parse::<StorageKind>().is_err());
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
