mod app;
mod auth;
mod config;
mod email;
mod error;
mod images;
mod reservations;
mod response;
mod spaces;
mod state;
mod storage;
#[cfg(test)]
mod test_db;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "sitme=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    if let Some(seed) = &app_state.config.admin {
        users::services::ensure_admin(&app_state.db, seed).await?;
    }

    app::serve(app::build_app(app_state)).await
}
