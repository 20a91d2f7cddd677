use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{auth::jwt::AuthUser, error::ApiResult, state::AppState};

use super::dto::{
    ChangePasswordRequest, CreateUserRequest, CreatedUserResponse, Pagination, PublicUser,
    UpdateUserRequest, UserIdResponse,
};
use super::services;

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/change-password", patch(change_password))
}

#[instrument(skip(state, query))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let Query(page) = query?;
    let users = services::list_users(state.users.as_ref(), &page).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, path))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Path(id) = path?;
    let user = services::get_user(state.users.as_ref(), id).await?;
    Ok(Json(user.into()))
}

/// Sign-up; the only users route that needs no token.
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Json<CreatedUserResponse>> {
    let Json(body) = payload?;
    let user = services::create_user(state.users.as_ref(), body).await?;
    Ok(Json(CreatedUserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state, path, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserIdResponse>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    services::update_user(state.users.as_ref(), id, body).await?;
    Ok(Json(UserIdResponse { id }))
}

#[instrument(skip(state, path))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserIdResponse>> {
    let Path(id) = path?;
    services::delete_user(state.users.as_ref(), id).await?;
    Ok(Json(UserIdResponse { id }))
}

#[instrument(skip(state, path, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<UserIdResponse>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    services::change_password(state.users.as_ref(), id, body).await?;
    Ok(Json(UserIdResponse { id }))
}
