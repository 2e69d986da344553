//! HTTP trigger surface: liveness and on-demand cycle runs.
//!
//! Two routes:
//! - `GET /` answers immediately, for liveness checks.
//! - `GET /crawl-now` starts a cycle in the background and returns at once.
//!
//! Cycles serialize on the controller's mutex. The manual trigger uses
//! `try_lock`: while a cycle is running (periodic or manual), another
//! trigger is rejected with `409` rather than queued, so shared state is
//! never driven by two cycles at once.

use crate::cycle::CycleController;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// The cycle controller behind the cycle-in-progress guard.
pub type SharedController = Arc<Mutex<CycleController>>;

/// Build the service router.
pub fn router(controller: SharedController) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/crawl-now", get(crawl_now))
        .with_state(controller)
}

async fn home() -> &'static str {
    "news_relay running"
}

async fn crawl_now(State(controller): State<SharedController>) -> (StatusCode, &'static str) {
    match controller.try_lock_owned() {
        Ok(mut guard) => {
            info!("Manual cycle trigger accepted");
            tokio::spawn(async move {
                match guard.run_cycle().await {
                    Ok(stats) => info!(?stats, "Manual cycle finished"),
                    Err(e) => error!(error = %e, "Manual cycle aborted"),
                }
            });
            (StatusCode::ACCEPTED, "cycle started")
        }
        Err(_) => {
            info!("Manual cycle trigger rejected; cycle already running");
            (StatusCode::CONFLICT, "cycle already in progress")
        }
    }
}
