use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Ten years; longer lifetimes are a misconfiguration.
const MAX_TOKEN_TTL_HOURS: i64 = 10 * 365 * 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin: Option<AdminAccount>,
}

/// Account promoted to ADMIN at startup.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let jwt_secret = get("CMS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CMS_JWT_SECRET is unset or still a placeholder; set it in the environment or .env");
        }

        let host = get("CMS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("CMS_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("CMS_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = get("CMS_DB_PATH").unwrap_or_else(|| "cms.db".into()).into();

        let token_ttl_hours: i64 = get("CMS_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".into())
            .parse()
            .context("CMS_TOKEN_TTL_HOURS must be an integer")?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            bail!("CMS_TOKEN_TTL_HOURS must be between 1 and {}", MAX_TOKEN_TTL_HOURS);
        }

        let admin = match (get("CMS_ADMIN_EMAIL"), get("CMS_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminAccount {
                username: get("CMS_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                email,
                password,
            }),
            (None, None) => None,
            _ => bail!("CMS_ADMIN_EMAIL and CMS_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl_hours,
            admin,
        })
    }
}
