//! Configuration module for the resource share backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Credentials of the staff account ensured at startup.
#[derive(Clone)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Staff account to create or promote on startup
    pub admin: Option<AdminAccount>,
    /// Allow cross-origin requests from any origin
    pub cors_any: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("SHARE_DB_PATH")
            .unwrap_or_else(|_| "./data/share.sqlite".to_string())
            .into();

        let bind_addr = env::var("SHARE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .expect("Invalid SHARE_BIND_ADDR format");

        let log_level = env::var("SHARE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("SHARE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let admin = match (
            env::var("SHARE_ADMIN_USERNAME"),
            env::var("SHARE_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminAccount { username, password })
            }
            _ => None,
        };

        let cors_any = env::var("SHARE_CORS_ANY")
            .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            admin,
            cors_any,
        }
    }
}
