//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthState, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::openapi_json;
use super::routes::{filters, health, tasks};
use crate::core::CoreApp;
use crate::core::constants::{API_PREFIX, DEFAULT_BODY_LIMIT};
use crate::data::TaskRepository;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Serve until shutdown is triggered, then hand the app back for cleanup
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = build_router(&app, &allowed_origins);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        tracing::debug!("API server stopped");
        Ok(app)
    }
}

fn build_router(app: &CoreApp, allowed_origins: &AllowedOrigins) -> Router<()> {
    let repository: Arc<dyn TaskRepository> = app.database.clone();

    let auth_state = AuthState::new(
        app.config.auth.enabled,
        app.config.auth.session_secret.as_deref(),
        allowed_origins.clone(),
    );

    let protected = Router::new()
        .merge(tasks::routes(repository.clone(), app.compiler.clone()))
        .merge(filters::routes(repository.clone(), app.compiler.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            require_auth,
        ));

    let api = Router::new()
        .merge(health::routes(repository))
        .route("/openapi.json", get(openapi_json))
        .merge(protected);

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors(allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}
