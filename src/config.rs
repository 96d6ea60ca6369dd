use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub remember_ttl_minutes: i64,
}

/// Local disk where uploaded photos land, and the URL prefix they are served under.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub dir: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userdesk-users".into()),
            ttl_minutes: minutes_from_env("TOKEN_TTL_MINUTES", 60 * 24),
            remember_ttl_minutes: minutes_from_env("REMEMBER_ME_TTL_MINUTES", 60 * 24 * 7),
        };
        let storage = StorageConfig {
            dir: std::env::var("STORAGE_DIR").unwrap_or_else(|_| "storage/app/public".into()),
            public_url: std::env::var("STORAGE_URL").unwrap_or_else(|_| "/storage".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
        })
    }
}

fn minutes_from_env(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
