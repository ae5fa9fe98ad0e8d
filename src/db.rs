use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
}

/// Runs migrations and seeds the rows the service expects to exist.
pub async fn prepare(db: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    crate::settings::seed_defaults(db).await?;
    crate::auth::bootstrap_admin(db, config.bootstrap_admin_email.as_deref(), config.bootstrap_admin_password.as_deref()).await?;
    let purged = crate::auth::session::purge_expired(db).await?;
    if purged > 0 { tracing::info!(purged, "removed expired sessions"); }
    Ok(())
}
