use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

use crate::db;

/// Create the catalog schema at `db_path`. Idempotent.
pub async fn run_migrations(db_path: &Path) -> Result<()> {
    let pool = db::connect(db_path).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // One row per cached item; the full normalized item lives in item_json.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_items (
            platform TEXT NOT NULL,
            id TEXT NOT NULL,
            title TEXT NOT NULL,
            search_text TEXT NOT NULL,
            upload_date INTEGER NOT NULL,
            is_live INTEGER NOT NULL DEFAULT 0,
            item_json TEXT NOT NULL,
            imported_at INTEGER NOT NULL,
            PRIMARY KEY (platform, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalog_upload_date ON catalog_items(upload_date DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_catalog_platform ON catalog_items(platform)")
        .execute(pool)
        .await?;

    Ok(())
}
