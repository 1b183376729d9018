//! QGen UI · interview question generator front end
//!
//! - Axum server rendering the page and htmx fragments (maud)
//! - Talks to the question backend over its `/api/*` JSON contract
//! - Static assets from `static_dir` (./static)
//!
//! Important env variables:
//!   PORT            : u16 (default 10000)
//!   BACKEND_URL     : question backend base URL (default "http://localhost:10001")
//!   MOCK_BACKEND    : "1" serves canned /api/* routes from this process
//!   UI_CONFIG_PATH  : path to TOML config (see `config::UiConfig`)
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod protocol;
mod markup;
mod highlight;
mod render;
mod form;
mod backend;
mod dispatch;
mod catalog;
mod envkey;
mod page;
mod views;
mod state;
mod logic;
mod mock;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::load_ui_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let mut config = load_ui_config_from_env();
  if config.mock_backend {
    // The canned backend lives on this very server.
    config.backend_url = format!("http://127.0.0.1:{}", config.port);
    info!(target: "qgen_ui", "Mock backend enabled");
  }
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  let state = Arc::new(AppState::new(config)?);
  let app = build_router(state.clone());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "qgen_ui", %addr, backend = %state.backend.base_url, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "qgen_ui", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "qgen_ui", "Shutdown requested");
}
