use std::path::PathBuf;

use anyhow::{bail, Context};

const DEFAULT_PORT: u16 = 7777;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
    /// Signing secret for the session cookie. A random key is used when unset,
    /// which logs everybody out on restart.
    pub session_secret: Option<String>,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT is not a valid port: {raw}"))?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES is not a number: {raw}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let session_secret = lookup("SESSION_SECRET");
        if let Some(secret) = &session_secret {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes");
            }
        }

        Ok(Self {
            database_url,
            port,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes,
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            session_secret,
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: lookup("ADMIN_PASSWORD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "mysql://localhost/drms")])).unwrap();
        assert_eq!(config.port, 7777);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.admin_username, "admin");
        assert!(config.session_secret.is_none());
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn rejects_bad_port_and_short_secret() {
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("SESSION_SECRET", "short")])).is_err());
    }
}
