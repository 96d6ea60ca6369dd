use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::AuthContext,
    error::{ApiError, MessageResponse},
    state::AppState,
    users::{
        dto::{ListQuery, Paginated, UserForm},
        repo_types::User,
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(index).post(store))
        .route(
            "/users/:id",
            get(show).put(update).patch(update).delete(destroy),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Paginated<User>>, ApiError> {
    // A query string that does not parse reads as the first page.
    let q = query.map(|Query(q)| q).unwrap_or_default();
    let page = services::list_users(&state, q.page(), uri.path()).await?;
    Ok(Json(page))
}

#[instrument(skip(state, form))]
pub async fn store(
    State(state): State<AppState>,
    auth: AuthContext,
    form: UserForm,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    services::create_user(&state, form).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Successfully created user!"),
    ))
}

/// Responds with `null` when the id is unknown or not a UUID.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Option<User>>, ApiError> {
    let user = services::find_user(&state, &id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    form: UserForm,
) -> Result<Json<MessageResponse>, ApiError> {
    services::update_user(&state, &id, form).await?;
    Ok(MessageResponse::new("Successfully updated user!"))
}

#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    services::delete_user(&state, &id).await?;
    Ok(MessageResponse::new("Successfully deleted user!"))
}
