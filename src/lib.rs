pub mod config;
pub mod db;
pub mod encode;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod render;
pub mod routes;
pub mod types;

use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use config::Config;
use db::Db;
use error::Result;
use extract::TyplessClient;
use routes::AppState;

/// Open the database, build the router and serve until the listener closes.
pub async fn run(config: Config) -> Result<()> {
    let db = Db::new(&config.db_path)?;
    let state = Arc::new(AppState {
        extractor: Arc::new(TyplessClient::new(&config)),
        db: Arc::new(db),
    });

    let app = routes::build_router(state, config.max_upload_bytes).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
