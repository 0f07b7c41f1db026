use anyhow::Result;

use crate::adapter_catalog::count_items;
use crate::config::Config;
use crate::db;
use crate::traits::AdapterRegistry;

/// Print every configured adapter with a short health detail.
pub async fn list_sources(config: &Config) -> Result<()> {
    let registry = AdapterRegistry::from_config(config)?;
    if registry.is_empty() {
        println!("No adapters configured.");
        return Ok(());
    }

    println!("{:<20} {:<10} {:<12} DETAIL", "ADAPTER", "TYPE", "PLATFORM");

    for info in registry.infos() {
        let detail = if let Some(cfg) = config.adapters.fixture.get(&info.name) {
            format!("{}", cfg.path.display())
        } else if let Some(cfg) = config.adapters.catalog.get(&info.name) {
            if cfg.path.exists() {
                let pool = db::connect(&cfg.path).await?;
                let count = count_items(&pool).await.unwrap_or(0);
                pool.close().await;
                format!("{} items ({})", count, cfg.path.display())
            } else {
                "NOT INITIALIZED (run `civic catalog init`)".to_string()
            }
        } else if let Some(cfg) = config.adapters.http.get(&info.name) {
            let key = match &cfg.api_key_env {
                Some(var) if std::env::var(var).is_err() => format!(" (missing ${})", var),
                _ => String::new(),
            };
            format!("{}{}", cfg.base_url, key)
        } else {
            info.description.clone()
        };

        println!(
            "{:<20} {:<10} {:<12} {}",
            info.name, info.adapter_type, info.platform, detail
        );
    }

    Ok(())
}
