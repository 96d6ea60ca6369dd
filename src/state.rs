use crate::auth::repo::{PgTokenStore, TokenStore};
use crate::config::AppConfig;
use crate::db;
use crate::storage::{LocalStorage, StorageClient};
use crate::users::repo::{PgUserStore, UserStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await;

        let storage = Arc::new(
            LocalStorage::new(&config.storage.dir, &config.storage.public_url).await?,
        ) as Arc<dyn StorageClient>;

        Ok(Self::from_parts(
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgTokenStore::new(pool)),
            config,
            storage,
        ))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            users,
            tokens,
            config,
            storage,
        }
    }
}
