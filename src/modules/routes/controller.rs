use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use bustrack_core::{ApiResponse, AppError, ErrorBody, MessageResponse, Paginated};

use crate::middleware::auth::MaybeAuthUser;
use crate::modules::parse_id;
use crate::state::AppState;
use crate::validator::{Validated, ValidatedQuery};

use super::model::{
    CreateRouteBody, CreateRouteRequest, Route, RouteFilterParams, UpdateRouteBody,
    UpdateRouteRequest,
};
use super::service::RouteService;

#[utoipa::path(
    get,
    path = "/api/v1/routes",
    params(RouteFilterParams),
    responses(
        (status = 200, description = "Routes ordered by code", body = Paginated<Route>)
    ),
    tag = "Routes"
)]
#[instrument(skip(state, caller), fields(caller.id = caller.0.as_ref().map(|u| u.id.as_str())))]
pub async fn list_routes(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    ValidatedQuery(filters): ValidatedQuery<RouteFilterParams>,
) -> Result<Json<Paginated<Route>>, AppError> {
    Ok(Json(RouteService::list_routes(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/routes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route", body = ApiResponse<Route>),
        (status = 404, description = "Route not found", body = ErrorBody)
    ),
    tag = "Routes"
)]
#[instrument(skip(state))]
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let id = parse_id(&id, "Route")?;
    Ok(Json(ApiResponse::ok(RouteService::get_route(&state.db, id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/routes",
    request_body = CreateRouteBody,
    responses(
        (status = 201, description = "Route created", body = ApiResponse<Route>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Permission 'routes.write' required", body = ErrorBody),
        (status = 409, description = "Route code already exists", body = ErrorBody)
    ),
    tag = "Routes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn create_route(
    State(state): State<AppState>,
    Validated(request): Validated<CreateRouteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Route>>), AppError> {
    let route = RouteService::create_route(&state.db, request.changes()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Route created successfully", route)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/routes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    request_body = UpdateRouteBody,
    responses(
        (status = 200, description = "Route updated", body = ApiResponse<Route>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Permission 'routes.write' required", body = ErrorBody),
        (status = 404, description = "Route not found", body = ErrorBody),
        (status = 409, description = "Route code already exists", body = ErrorBody)
    ),
    tag = "Routes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_route(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateRouteRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let id = parse_id(&request.params.id, "Route")?;
    let route = RouteService::update_route(&state.db, id, request.changes()).await?;
    Ok(Json(ApiResponse::with_message("Route updated successfully", route)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/routes/{id}",
    params(("id" = String, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Route not found", body = ErrorBody)
    ),
    tag = "Routes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Route")?;
    RouteService::delete_route(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Route deleted successfully")))
}
