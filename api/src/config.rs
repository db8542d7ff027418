use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    fn parse(s: &str) -> Self {
        match s {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            _ => Env::Dev,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub database_max_connections: usize,
    pub listen_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub session_ttl_days: i64,
    pub storage: Option<StorageConfig>,
}

/// Where uploaded images are written to and served from
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub dir: String,
    pub public_url: String,
}

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;
const DEFAULT_MAX_CONNECTIONS: usize = 10;

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => {
                tracing::debug!("Missing environment variable `{key}`");
                Ok(None)
            }
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Either all or none variables are set
fn all_or_none_vars(keys: Vec<&str>) -> Option<Vec<String>> {
    let values: Vec<Option<String>> = keys.iter().map(|k| var(k).ok().flatten()).collect();

    if values.iter().all(Option::is_some) {
        return Some(values.into_iter().flatten().collect());
    }

    if values.iter().any(Option::is_some) {
        tracing::error!("Environment variables {keys:?} must be either all set or all unset");
    }

    None
}

/// Parses an optional variable, falling back to `default` when it is absent
/// or malformed.
fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Could not parse environment variable `{key}`, using default");
            default
        }),
        _ => default,
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let storage = all_or_none_vars(vec!["STORAGE_DIR", "PUBLIC_STORAGE_URL"]).map(
            |mut vars| StorageConfig {
                dir: vars.remove(0),
                public_url: vars.remove(0),
            },
        );

        let default_addr: SocketAddr = DEFAULT_LISTEN_ADDR
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000)));

        ServerConfig {
            env: match var("ENVIRONMENT") {
                Ok(Some(env)) => Env::parse(&env),
                _ => Env::Dev,
            },
            database_url: required_var("DATABASE_URL"),
            database_max_connections: parsed_var(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            ),
            listen_addr: parsed_var("LISTEN_ADDR", default_addr),
            cors_origins: match var("CORS_ORIGINS") {
                Ok(Some(raw)) => parse_origins(&raw),
                _ => vec![],
            },
            session_ttl_days: parsed_var("SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS).max(1),
            storage,
        }
    }

    pub fn is_dev(&self) -> bool {
        self.env == Env::Dev
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_to_dev() {
        assert_eq!(Env::parse("production"), Env::Production);
        assert_eq!(Env::parse("staging"), Env::Staging);
        assert_eq!(Env::parse("whatever"), Env::Dev);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://a.dev/ ,https://b.dev,, "),
            vec!["https://a.dev".to_string(), "https://b.dev".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }
}
