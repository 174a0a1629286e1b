//! `prestasi serve` -- HTTP JSON API for the achievement workflow.
//!
//! Everything under the API prefix (default `/api/v1`) needs a bearer token.
//! `/health` and the uploaded files are public.
//!
//! Endpoints (relative to the prefix):
//! - GET    /achievements                         - role-scoped listing
//! - POST   /achievements                         - create draft
//! - GET    /achievements/me                      - caller's live content
//! - GET    /achievements/deleted                 - caller's soft-deleted content
//! - GET    /achievements/bimbingan               - advisees' achievements (advisor/admin)
//! - GET    /achievements/orphans                 - content without a reference
//! - POST   /achievements/orphans/{cid}/reference - complete an orphan
//! - DELETE /achievements/orphans/{cid}           - discard an orphan
//! - GET    /achievements/{id}                    - detail
//! - PUT    /achievements/{id}                    - update draft
//! - DELETE /achievements/{id}                    - delete draft
//! - POST   /achievements/{id}/submit
//! - POST   /achievements/{id}/verify             - advisor/admin
//! - POST   /achievements/{id}/reject             - advisor/admin, body `{note}`
//! - GET    /achievements/{id}/history
//! - POST   /achievements/{id}/attachments        - multipart field `file`
//! - GET    /admin/achievements                   - admin
//! - PUT    /admin/students/{id}/advisor          - admin, body `{lecturer_id}`

mod error;
mod extract;
mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Router};
use prestasi_storage::memory::{MemoryContentStore, MemoryDirectory, MemoryReferenceStore};
use prestasi_storage::LocalFileStore;
use prestasi_workflow::WorkflowEngine;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use self::middleware::{auth_middleware, require_admin, require_verifier};
use self::state::AppState;
use crate::config::Config;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("prestasi=info,info"));
    // A subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    let verifier_routes = Router::new()
        .route("/achievements/bimbingan", get(handle_bimbingan))
        .route("/achievements/{id}/verify", post(handle_verify))
        .route("/achievements/{id}/reject", post(handle_reject))
        .route_layer(axum_middleware::from_fn(require_verifier));

    let admin_routes = Router::new()
        .route("/admin/achievements", get(handle_admin_list))
        .route("/admin/students/{id}/advisor", put(handle_assign_advisor))
        .route_layer(axum_middleware::from_fn(require_admin));

    let api = Router::new()
        .route("/achievements", get(handle_list).post(handle_create))
        .route("/achievements/me", get(handle_mine))
        .route("/achievements/deleted", get(handle_deleted))
        .route("/achievements/orphans", get(handle_list_orphans))
        .route(
            "/achievements/orphans/{content_id}/reference",
            post(handle_complete_orphan),
        )
        .route(
            "/achievements/orphans/{content_id}",
            axum::routing::delete(handle_discard_orphan),
        )
        .route(
            "/achievements/{id}",
            get(handle_detail).put(handle_update).delete(handle_delete),
        )
        .route("/achievements/{id}/submit", post(handle_submit))
        .route("/achievements/{id}/history", get(handle_history))
        .route("/achievements/{id}/attachments", post(handle_upload))
        .merge(verifier_routes)
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let root = Router::new().route("/health", get(handle_health));
    let root = match config.server.api_prefix.as_str() {
        "/" => root.merge(api),
        prefix => root.nest(prefix, api),
    };

    root.nest_service(
        &config.uploads.url_prefix,
        ServeDir::new(config.uploads.dir.clone()),
    )
    .fallback(handle_not_found)
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
    .with_state(state)
}

/// Start the HTTP server.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
pub async fn start_server(
    config: Config,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    config.validate()?;
    let verifying_key = config.verifying_key()?;

    tokio::fs::create_dir_all(&config.uploads.dir).await?;
    let seed = config.directory.clone();
    tracing::info!(
        users = seed.users.len(),
        students = seed.students.len(),
        lecturers = seed.lecturers.len(),
        "directory seeded"
    );

    let engine = WorkflowEngine::new(
        Arc::new(MemoryContentStore::new()),
        Arc::new(MemoryReferenceStore::new()),
        Arc::new(MemoryDirectory::new(seed.users, seed.students, seed.lecturers)),
        Arc::new(LocalFileStore::new(
            config.uploads.dir.clone(),
            config.uploads.url_prefix.clone(),
        )),
    );
    let state = Arc::new(AppState {
        engine,
        verifying_key,
    });
    let app = build_router(state, &config);
    let addr = config.server.listen;

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        tracing::info!(%addr, "prestasi listening on https");
        axum_server::bind_rustls(addr, tls)
            .handle(shutdown_handle(shutdown_signal()))
            .serve(app.into_make_service())
            .await?;
        tracing::info!("server shut down");
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, prefix = %config.server.api_prefix, "prestasi listening on http");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// How long in-flight HTTPS requests get to finish once shutdown starts.
#[cfg(feature = "tls")]
const TLS_SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(10);

/// An `axum-server` handle that starts a graceful shutdown when `signal`
/// resolves.
#[cfg(feature = "tls")]
fn shutdown_handle<F>(signal: F) -> axum_server::Handle
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle: axum_server::Handle = axum_server::Handle::new();
    let watcher = handle.clone();
    tokio::spawn(async move {
        signal.await;
        watcher.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
    });
    handle
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
