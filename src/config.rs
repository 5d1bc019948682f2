use anyhow::Context;
use serde::Deserialize;

/// Connection material for the document store, as found in the environment.
/// Accepted either inline as JSON or as a path to a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreCredentials {
    pub uri: String,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_seconds: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreConfig::from_env()?;

        let secret = match env_nonempty("SESSION_SECRET") {
            Some(value) => value,
            None => {
                tracing::warn!("SESSION_SECRET is not set; sessions use an insecure development secret");
                "replace-this-in-production".into()
            }
        };
        let session = SessionConfig {
            secret,
            ttl_seconds: std::env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 60 * 24 * 7),
            cookie_secure: std::env::var("APP_ENV")
                .map(|v| v == "production")
                .unwrap_or(false),
        };

        let http = HttpConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".into())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        };

        Ok(Self { store, session, http })
    }

    #[cfg(test)]
    pub(crate) fn fake() -> Self {
        Self {
            store: StoreConfig {
                uri: "mongodb://localhost:27017".into(),
                database: "wicket-test".into(),
            },
            session: SessionConfig {
                secret: "test-secret".into(),
                ttl_seconds: 60 * 60 * 24 * 7,
                cookie_secure: false,
            },
            http: HttpConfig {
                host: "127.0.0.1".into(),
                port: 0,
                cors_origins: vec!["http://localhost:3000".into()],
            },
        }
    }
}

impl StoreConfig {
    /// Credentials are looked up in order: inline JSON, a credentials file,
    /// then the plain connection URI, falling back to a local instance.
    /// `STORE_DATABASE` overrides whatever the credentials carry.
    fn from_env() -> anyhow::Result<Self> {
        let credentials = resolve_credentials()?;
        let database = env_nonempty("STORE_DATABASE")
            .or(credentials.database)
            .unwrap_or_else(|| "wicket".into());
        Ok(Self {
            uri: credentials.uri,
            database,
        })
    }
}

fn resolve_credentials() -> anyhow::Result<StoreCredentials> {
    if let Some(raw) = env_nonempty("STORE_CREDENTIALS") {
        return serde_json::from_str(&raw).context("STORE_CREDENTIALS is not valid JSON");
    }
    if let Some(path) = env_nonempty("STORE_CREDENTIALS_FILE") {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read credentials file {path}"))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("credentials file {path} is not valid JSON"));
    }
    let uri = env_nonempty("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".into());
    Ok(StoreCredentials { uri, database: None })
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
