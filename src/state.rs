use crate::auth::repo::{MemoryUserStore, PgUserStore, UserStore};
use crate::calculations::repo::{CalculationStore, MemoryCalculationStore, PgCalculationStore};
use crate::config::AppConfig;
use crate::db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub calculations: Arc<dyn CalculationStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let Some(database_url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set; using in-memory stores, data is lost on exit");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(database_url).await?;
        db::migrate(&pool).await?;

        Ok(Self {
            users: Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>,
            calculations: Arc::new(PgCalculationStore::new(pool)) as Arc<dyn CalculationStore>,
            config,
        })
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            users: Arc::new(MemoryUserStore::default()),
            calculations: Arc::new(MemoryCalculationStore::default()),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self::in_memory(config)
    }
}
