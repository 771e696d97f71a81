use backend::{
    config::AppConfig,
    db,
    web_server::{run_server, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Setup ---
    // 1. Initialize structured logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO) // This sets the minimum level to INFO
        .init();

    // 2. Load configuration; DATABASE_URL and JWT_SECRET are mandatory
    let app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Missing or invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Connect to the store and migrate
    let db_pool = db::connect(&app_config.database).await?;

    // --- Run Server ---
    tracing::info!("Initializing server...");
    run_server(AppState::new(db_pool, app_config)).await
}
