use std::str::FromStr;

use time::Duration;

use crate::error::AppError;
use crate::store::Backend;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub backend: Backend,
    /// HS256 signing secret for issued tokens.
    pub token_secret: String,
    /// Token lifetime (default 1 hour). Override with TODO_TOKEN_TTL_SECS.
    pub token_ttl: Duration,
    /// When false the todo routes accept anonymous requests.
    pub require_auth: bool,
    pub base_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests don't have to touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = parse_or(&lookup, "TODO_PORT", 3000u16)?;
        let ttl_secs = parse_or(&lookup, "TODO_TOKEN_TTL_SECS", 3600i64)?;
        if ttl_secs <= 0 {
            return Err(AppError::Configuration(
                "TODO_TOKEN_TTL_SECS must be positive".to_string(),
            ));
        }

        let require_auth = lookup("TODO_REQUIRE_AUTH")
            .map(|v| !matches!(v.as_str(), "0" | "false" | "FALSE" | "off"))
            .unwrap_or(true);
        let token_secret = lookup("TODO_TOKEN_SECRET").unwrap_or_default();
        if require_auth && token_secret.is_empty() {
            return Err(AppError::Configuration(
                "TODO_TOKEN_SECRET must be set".to_string(),
            ));
        }

        let seed_demo = lookup("TODO_SEED_DEMO")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on"))
            .unwrap_or(false);
        let backend = match lookup("TODO_DB").as_deref() {
            Some("memory") => Backend::Memory { seed_demo },
            Some(path) => Backend::Sqlite(path.to_string()),
            None => Backend::Sqlite("todos.db".to_string()),
        };

        let base_path = lookup("TODO_BASE_PATH")
            .map(|path| normalize_base_path(&path))
            .unwrap_or_default();

        Ok(Config {
            port,
            backend,
            token_secret,
            token_ttl: Duration::seconds(ttl_secs),
            require_auth,
            base_path,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("{key} is not valid: {raw:?}"))),
        None => Ok(default),
    }
}

fn normalize_base_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
