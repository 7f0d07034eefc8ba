use crate::{handlers::*, middleware::*, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

pub fn create_router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/admin/create/:user/:password", post(admin_create))
        .route("/admin/promote/:user", post(admin_promote))
        .route("/admin/delete/:user", delete(admin_delete))
        .route("/admin/users", get(list_users))
        // Outermost layer runs first, so the user is resolved before the role check.
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let session = Router::new()
        .route("/verify", get(verify_user))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let mut exports = Router::new()
        .route("/upload/:tool", post(upload_csv))
        .route("/download/:tool/latest", get(download_latest));
    if state.config.exports.require_auth {
        exports = exports.route_layer(from_fn_with_state(state.clone(), require_user));
    }

    Router::new()
        .route("/", get(root))
        .route("/login", post(login))
        .route("/version", get(get_version))
        // Health and metrics
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        .merge(admin)
        .merge(session)
        .merge(exports)
}

pub fn build_router(state: AppState) -> Router {
    create_router(&state).with_state(state)
}
