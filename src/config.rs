use std::path::PathBuf;

use crate::error::{IntakeError, Result};

pub const DEFAULT_TYPLESS_URL: &str = "https://developers.typless.com/api/extract-data";
const DEFAULT_DB_PATH: &str = "data/docs.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_MAX_UPLOAD_MB: usize = 20;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub typless_api_key: String,
    pub typless_api_url: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Body limit for `/process`; `/save` derives its own from it.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load `.env` (if any) and read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let typless_api_key = non_blank("TYPLESS_API_KEY").ok_or(IntakeError::MissingConfig {
            var: "TYPLESS_API_KEY",
        })?;
        let typless_api_url =
            non_blank("TYPLESS_API_URL").unwrap_or_else(|| DEFAULT_TYPLESS_URL.to_string());
        let db_path = non_blank("INTAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let host = non_blank("INTAKE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_blank("INTAKE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| IntakeError::InvalidConfig {
                var: "INTAKE_PORT",
                reason: format!("'{}': {}", raw, e),
            })?,
            None => DEFAULT_PORT,
        };
        let max_upload_bytes = match non_blank("INTAKE_MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| e.to_string())
                .and_then(|mb| {
                    mb.checked_mul(1024 * 1024)
                        .ok_or_else(|| "too large".to_string())
                })
                .map_err(|reason| IntakeError::InvalidConfig {
                    var: "INTAKE_MAX_UPLOAD_MB",
                    reason: format!("'{}': {}", raw, reason),
                })?,
            None => DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        };

        Ok(Config {
            typless_api_key,
            typless_api_url,
            db_path,
            host,
            port,
            max_upload_bytes,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
