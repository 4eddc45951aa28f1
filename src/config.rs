use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

const MONGO_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];
// characters MongoDB refuses in database names
const FORBIDDEN_DB_NAME_CHARS: [char; 7] = ['/', '\\', '.', ' ', '"', '$', '\0'];

#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Connection string without the database path.
    pub url: String,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
    pub max_idle_time: Duration,
    pub app_name: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("DB_HOST").unwrap_or_else(|| "localhost".into());
        let port = parse_or(&get, "DB_PORT", 27017u16)?;
        let url = get("MONGO_URL").unwrap_or_else(|| format!("mongodb://{}:{}", host, port));

        let config = Self {
            name: get("DB_NAME").unwrap_or_else(|| "pae_menus".into()),
            user: get("DB_USER"),
            password: get("DB_PASSWORD"),
            url,
            min_pool_size: parse_or(&get, "DB_MIN_POOL_SIZE", 10)?,
            max_pool_size: parse_or(&get, "DB_MAX_POOL_SIZE", 50)?,
            connect_timeout: millis_or(&get, "DB_CONNECT_TIMEOUT_MS", 5_000)?,
            server_selection_timeout: millis_or(&get, "DB_SERVER_SELECTION_TIMEOUT_MS", 5_000)?,
            max_idle_time: millis_or(&get, "DB_MAX_IDLE_TIME_MS", 30_000)?,
            app_name: get("DB_APP_NAME").unwrap_or_else(|| "pae-menus".into()),
            host,
            port,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let rest = MONGO_SCHEMES
            .iter()
            .find_map(|scheme| self.url.strip_prefix(scheme))
            .ok_or_else(|| {
                DbError::config("connection URL must start with mongodb:// or mongodb+srv://")
            })?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(DbError::config("connection URL has no host"));
        }

        if self.name.is_empty() {
            return Err(DbError::config("database name must not be empty"));
        }
        if let Some(c) = self.name.chars().find(|c| FORBIDDEN_DB_NAME_CHARS.contains(c)) {
            return Err(DbError::config(format!(
                "database name '{}' contains forbidden character {:?}",
                self.name, c
            )));
        }

        for (key, value) in [
            ("connect timeout", self.connect_timeout),
            ("server selection timeout", self.server_selection_timeout),
            ("max idle time", self.max_idle_time),
        ] {
            if value.is_zero() {
                return Err(DbError::config(format!("{} must be positive", key)));
            }
        }

        if self.max_pool_size == 0 {
            return Err(DbError::config("max pool size must be at least 1"));
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(DbError::config(format!(
                "min pool size {} exceeds max pool size {}",
                self.min_pool_size, self.max_pool_size
            )));
        }

        if self.password.is_some() && self.user.is_none() {
            return Err(DbError::config("DB_PASSWORD is set without DB_USER"));
        }
        Ok(())
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .field("server_selection_timeout", &self.server_selection_timeout)
            .field("max_idle_time", &self.max_idle_time)
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, DbError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| DbError::config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

fn millis_or<G>(get: &G, key: &str, default_ms: u64) -> Result<Duration, DbError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<DbConfig, DbError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DbConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = load(&[]).expect("defaults are valid");
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 27017);
        assert_eq!(cfg.url, "mongodb://localhost:27017");
        assert_eq!(cfg.name, "pae_menus");
        assert_eq!(cfg.min_pool_size, 10);
        assert_eq!(cfg.max_pool_size, 50);
        assert_eq!(cfg.server_selection_timeout, Duration::from_secs(5));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_idle_time, Duration::from_secs(30));
    }

    #[test]
    fn url_is_built_from_host_and_port() {
        let cfg = load(&[("DB_HOST", "mongo"), ("DB_PORT", "27018")]).unwrap();
        assert_eq!(cfg.url, "mongodb://mongo:27018");
    }

    #[test]
    fn explicit_url_wins() {
        let cfg = load(&[("DB_HOST", "ignored"), ("MONGO_URL", "mongodb+srv://cluster.example.net")])
            .unwrap();
        assert_eq!(cfg.url, "mongodb+srv://cluster.example.net");
        assert_eq!(cfg.host, "ignored");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = load(&[("DB_NAME", "   ")]).unwrap();
        assert_eq!(cfg.name, "pae_menus");
    }

    #[test]
    fn rejects_unparsable_port() {
        let err = load(&[("DB_PORT", "mongo")]).unwrap_err();
        assert!(matches!(err, DbError::Configuration(ref m) if m.contains("DB_PORT")));
    }

    #[test]
    fn rejects_bad_scheme() {
        let err = load(&[("MONGO_URL", "postgres://localhost:5432")]).unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }

    #[test]
    fn rejects_url_without_host() {
        assert!(load(&[("MONGO_URL", "mongodb://")]).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = load(&[("DB_SERVER_SELECTION_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("server selection timeout"));
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let err = load(&[("DB_MIN_POOL_SIZE", "20"), ("DB_MAX_POOL_SIZE", "5")]).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn rejects_forbidden_database_name() {
        assert!(load(&[("DB_NAME", "pae.menus")]).is_err());
    }

    #[test]
    fn rejects_password_without_user() {
        assert!(load(&[("DB_PASSWORD", "secret")]).is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg = load(&[("DB_USER", "pae"), ("DB_PASSWORD", "hunter2")]).unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
