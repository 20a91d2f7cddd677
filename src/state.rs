use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{MongoUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::connect(&config.mongo).await?;
        let store = MongoUserStore::new(&db);
        store.ensure_indexes().await?;

        Ok(Self {
            users: Arc::new(store) as Arc<dyn UserStore>,
            config,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, MongoConfig, ServerConfig};
        use crate::users::repo::memory::InMemoryUserStore;

        let config = Arc::new(AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            mongo: MongoConfig {
                url: "mongodb://localhost:27017".into(),
                database: "usersvc-test".into(),
                max_pool_size: 1,
            },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });

        Self {
            users: Arc::new(InMemoryUserStore::default()) as Arc<dyn UserStore>,
            config,
        }
    }
}
