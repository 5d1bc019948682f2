mod app;
mod auth;
mod config;
mod error;
mod state;
mod store;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "wicket=debug,axum=info,tower_http=info".to_string());
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

    let state = AppState::init().await?;

    // Index bootstrap needs store privileges the deployment may not grant.
    if let Err(e) = state.store.ensure_indexes().await {
        tracing::warn!(error = %e, "index bootstrap failed; continuing");
    }

    let host = state.config.http.host.clone();
    let port = state.config.http.port;
    let app = app::build_app(state);

    app::serve(app, &host, port).await
}
