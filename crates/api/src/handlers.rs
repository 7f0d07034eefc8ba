use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use axum_extra::extract::WithRejection;
use hana_metrics::TracingService;
use hana_models::{
    HanaError, ListUsersResponse, LoginForm, MessageResponse, ReleaseInfo, Role, RootResponse,
    TokenResponse, UploadResponse, User, UserSummary, VerifyResponse,
};
use tracing::{error, info, instrument};

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse::default())
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    Ok(state.metrics.get_prometheus_metrics()?)
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<LoginForm>, ApiError>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state.auth.login(&form).await {
        Ok(token) => {
            state.metrics.record_login(&form.username);
            Ok(Json(token))
        }
        Err(e) => {
            if matches!(e, HanaError::InvalidCredentials) {
                state.metrics.record_login_failure(&form.username);
                TracingService::log_login_rejected(&form.username);
            } else {
                error!("Login failed for {}: {}", form.username, e);
            }
            Err(e.into())
        }
    }
}

#[instrument(skip_all, fields(user = %user.name))]
pub async fn verify_user(Extension(user): Extension<User>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        user: user.name,
        status: "valid".to_string(),
    })
}

#[instrument(skip(state))]
pub async fn get_version(State(state): State<AppState>) -> Json<ReleaseInfo> {
    Json(state.releases.current().await)
}

// -------- Users admin --------
#[instrument(skip(state, admin, password), fields(admin = %admin.name))]
pub async fn admin_create(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    WithRejection(Path((user, password)), _): WithRejection<Path<(String, String)>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let created = state
        .registry()
        .create_user(&user, &password, Role::User)
        .await?;
    state.metrics.record_user_created(&created.name);
    TracingService::log_user_created(&created, &admin.name);
    Ok(Json(MessageResponse::new("user added")))
}

#[instrument(skip(state, admin), fields(admin = %admin.name))]
pub async fn admin_promote(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    WithRejection(Path(user), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.registry().promote(&user).await?;
    TracingService::log_user_promoted(&user, &admin.name);
    Ok(Json(MessageResponse::new(format!("{user} promoted"))))
}

#[instrument(skip(state, admin), fields(admin = %admin.name))]
pub async fn admin_delete(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    WithRejection(Path(user), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.registry().delete_user(&user).await?;
    state.metrics.record_user_deleted(&user);
    TracingService::log_user_deleted(&user, &admin.name);
    Ok(Json(MessageResponse::new("user deleted")))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<ListUsersResponse>, ApiError> {
    let users = state
        .registry()
        .list_users()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(Json(ListUsersResponse { users }))
}

// -------- CSV exchange --------
#[instrument(skip(state, multipart))]
pub async fn upload_csv(
    State(state): State<AppState>,
    WithRejection(Path(tool), _): WithRejection<Path<String>, ApiError>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<UploadResponse>, ApiError> {
    if !state.exports.is_known_tool(&tool) {
        return Err(HanaError::UnknownTool { tool }.into());
    }

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        state.exports.check_upload(&tool, &file_name)?;

        let bytes = field.bytes().await?;

        let stored = state.exports.store(&tool, &file_name, &bytes).await?;
        state.metrics.record_upload(&tool, stored.size);
        TracingService::log_export_stored(&stored);
        return Ok(Json(stored.into()));
    }

    Err(HanaError::MissingUpload.into())
}

#[instrument(skip(state))]
pub async fn download_latest(
    State(state): State<AppState>,
    WithRejection(Path(tool), _): WithRejection<Path<String>, ApiError>,
) -> Result<Response, ApiError> {
    let (latest, bytes) = state.exports.read_latest(&tool).await?;
    state.metrics.record_download(&tool);
    info!("Serving {} for {}", latest.stored_as, tool);

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        latest.stored_as
    ))
    .map_err(|e| HanaError::Internal { reason: e.to_string() })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
