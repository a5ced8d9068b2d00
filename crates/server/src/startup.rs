use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, AppState};
use service::{file::user_store::UserStore, runtime};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn parse_bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    cfg.bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("{}: {}", cfg.bind_addr(), e)))
}

/// Load the data file and assemble the router around it.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    runtime::ensure_data_dir(&cfg.storage.data_file).await?;
    let store = UserStore::load(cfg.storage.data_file.clone()).await?;
    let state = AppState { users: store };
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    let app = build_app(&cfg).await?;

    let addr = parse_bind_addr(&cfg)?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(anyhow::Error::from)?;
    info!(%addr, data_file = %cfg.storage.data_file.display(), "server listening");
    println!("Server running at http://{}", addr);
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}

/// Same as [`run`] but for an already constructed state; used by tests that bring their own store.
pub async fn serve_with(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> Result<(), StartupError> {
    let app = routes::build_router(state, build_cors());
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_host_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "not a host".into();
        assert!(matches!(parse_bind_addr(&cfg), Err(StartupError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn build_app_seeds_data_file() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("server_startup_{}", uuid::Uuid::new_v4()));
        let mut cfg = AppConfig::default();
        cfg.storage.data_file = dir.join("db.json");
        build_app(&cfg).await?;
        let raw = tokio::fs::read(&cfg.storage.data_file).await?;
        let body: serde_json::Value = serde_json::from_slice(&raw)?;
        assert_eq!(body["users"][0]["name"], "guest");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[test]
    fn default_addr_parses() {
        let cfg = AppConfig::default();
        assert_eq!(parse_bind_addr(&cfg).unwrap().port(), 3000);
    }
}
