use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use bustrack_core::{ApiResponse, AppError, ErrorBody, MessageResponse, Paginated, PaginationParams};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::{Validated, ValidatedQuery};

use super::model::{ChangePasswordBody, ChangePasswordRequest, UpdateUserBody, UpdateUserRequest, User};
use super::service::UserService;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(
        ("limit" = Option<i64>, Query, description = "Page size, 1-100 (default 10)"),
        ("offset" = Option<i64>, Query, description = "Items to skip"),
        ("page" = Option<i64>, Query, description = "1-indexed page; overrides offset")
    ),
    responses(
        (status = 200, description = "Users, newest first", body = Paginated<User>),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Admin access required", body = ErrorBody)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<User>>, AppError> {
    Ok(Json(UserService::list_users(&state, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = ApiResponse<User>),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Not this user and not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    Ok(Json(ApiResponse::ok(UserService::get_user(&state, &id).await?)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserBody,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<User>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Not this user and not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email or username already taken", body = ErrorBody)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserService::update_user(&state, request).await?;
    Ok(Json(ApiResponse::with_message("User updated successfully", user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/password",
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Current password is incorrect", body = ErrorBody),
        (status = 403, description = "Not the owner and not an admin", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Validated(request): Validated<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::change_password(&state, &caller, request).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
