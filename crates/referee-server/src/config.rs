use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("REFEREE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "REFEREE_JWT_SECRET is unset or still a placeholder. \
                 It must match the sign-in service's secret; set it in your .env file."
            );
        }

        let db_path = var("REFEREE_DB_PATH").unwrap_or_else(|| "referee.db".into());
        let host = var("REFEREE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("REFEREE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("REFEREE_PORT must be a port number")?;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        Ok(Self {
            db_path: db_path.into(),
            addr,
            jwt_secret,
        })
    }
}
