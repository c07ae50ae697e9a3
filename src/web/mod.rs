//! HTTP front end.
mod error;
pub mod pages;
mod routes;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};

pub use error::ApiError;

use crate::config::Config;
use crate::handler::AssetHandler;
use crate::workspace::Workspace;

pub struct AppState {
    pub workspace: Workspace,
    handler: Mutex<AssetHandler>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(workspace: Workspace) -> SharedState {
        Arc::new(Self { handler: Mutex::new(AssetHandler::new(workspace.clone())), workspace })
    }

    /// The handler is only touched from blocking tasks.
    pub fn handler(&self) -> MutexGuard<'_, AssetHandler> {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/upload", post(routes::upload))
        .route("/view/*filename", get(routes::view))
        .route("/replace_texture", post(routes::replace_texture))
        .route("/download_modified", get(routes::download_modified))
        .layer(middleware::from_fn_with_state(state.clone(), routes::cleanup_temp))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(config: &Config) -> std::io::Result<()> {
    let workspace = Workspace::create(&config.data_dir)?;
    log::info!("data directory {}", config.data_dir.display());
    let app = router(AppState::new(workspace), config.max_upload_bytes());
    let listener = tokio::net::TcpListener::bind(config.address()).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
