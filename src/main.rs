use std::sync::Arc;
use std::time::Duration;

use moodflix_api::{
    config::Config, db, routes::create_router, services::ModelServerClient, state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodflix_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let model = ModelServerClient::new(
        config.model_base_url.clone(),
        Duration::from_secs(config.model_timeout_secs),
    )?;
    let state = AppState::new(pool, Arc::new(model));

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
