pub mod error;
pub mod handlers;
pub mod middleware;
pub mod release;
pub mod routes;
pub mod state;

pub use error::*;
pub use handlers::*;
pub use middleware::*;
pub use release::*;
pub use routes::*;
pub use state::*;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Full application: routes plus tracing, CORS and the request body cap.
pub fn build_app(state: AppState) -> Router {
    let body_size_limit = state.config.max_request_body_bytes();

    Router::new().merge(build_router(state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(body_size_limit)),
    )
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("User API server stopped");
    Ok(())
}

pub async fn start_server<F>(
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind = state.config.server.bind.clone();
    let port = state.config.server.port;

    let listener = TcpListener::bind(format!("{bind}:{port}")).await?;
    info!("User API server listening on {}:{}", bind, port);

    serve(listener, state, shutdown).await
}
