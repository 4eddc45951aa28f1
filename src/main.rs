use pae_menus::{DbConfig, DbManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "pae_menus=debug,mongodb=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = DbConfig::from_env()?;
    tracing::debug!(?config, "loaded database config");

    let db = DbManager::new(config);
    db.init().await?;

    let health = db.health_check().await;
    tracing::info!(health = %serde_json::to_string(&health)?, "database ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    db.close().await;

    Ok(())
}
