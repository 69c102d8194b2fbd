use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use bustrack_core::{ApiResponse, AppError, ErrorBody, MessageResponse, Paginated, PaginationParams};

use crate::modules::parse_id;
use crate::state::AppState;
use crate::validator::{Validated, ValidatedQuery};

use super::model::{
    Bus, BusFilterParams, CreateBusBody, CreateBusRequest, Location, LocationBody, UpdateBusBody,
    UpdateBusRequest, UpdateLocationRequest,
};
use super::service::BusService;

#[utoipa::path(
    get,
    path = "/api/v1/buses",
    params(BusFilterParams),
    responses(
        (status = 200, description = "Buses, newest first", body = Paginated<Bus>)
    ),
    tag = "Buses"
)]
#[instrument(skip(state))]
pub async fn list_buses(
    State(state): State<AppState>,
    ValidatedQuery(filters): ValidatedQuery<BusFilterParams>,
) -> Result<Json<Paginated<Bus>>, AppError> {
    Ok(Json(BusService::list_buses(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/buses/{id}",
    params(("id" = String, Path, description = "Bus ID")),
    responses(
        (status = 200, description = "Bus", body = ApiResponse<Bus>),
        (status = 404, description = "Bus not found", body = ErrorBody)
    ),
    tag = "Buses"
)]
#[instrument(skip(state))]
pub async fn get_bus(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Bus>>, AppError> {
    let id = parse_id(&id, "Bus")?;
    Ok(Json(ApiResponse::ok(BusService::get_bus(&state.db, id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/buses",
    request_body = CreateBusBody,
    responses(
        (status = 201, description = "Bus created", body = ApiResponse<Bus>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Admin or operator role required", body = ErrorBody),
        (status = 409, description = "Plate number already registered", body = ErrorBody)
    ),
    tag = "Buses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn create_bus(
    State(state): State<AppState>,
    Validated(request): Validated<CreateBusRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Bus>>), AppError> {
    let bus = BusService::create_bus(&state.db, request.changes()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Bus created successfully", bus)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/buses/{id}",
    params(("id" = String, Path, description = "Bus ID")),
    request_body = UpdateBusBody,
    responses(
        (status = 200, description = "Bus updated", body = ApiResponse<Bus>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Admin or operator role required", body = ErrorBody),
        (status = 404, description = "Bus not found", body = ErrorBody)
    ),
    tag = "Buses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_bus(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateBusRequest>,
) -> Result<Json<ApiResponse<Bus>>, AppError> {
    let id = parse_id(&request.params.id, "Bus")?;
    let bus = BusService::update_bus(&state.db, id, request.changes()).await?;
    Ok(Json(ApiResponse::with_message("Bus updated successfully", bus)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/buses/{id}",
    params(("id" = String, Path, description = "Bus ID")),
    responses(
        (status = 200, description = "Bus deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Bus not found", body = ErrorBody)
    ),
    tag = "Buses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_bus(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Bus")?;
    BusService::delete_bus(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Bus deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/v1/buses/{id}/location",
    params(("id" = String, Path, description = "Bus ID")),
    request_body = LocationBody,
    responses(
        (status = 200, description = "Location recorded", body = ApiResponse<Bus>),
        (status = 400, description = "Validation failed or bus id missing", body = ErrorBody),
        (status = 403, description = "No access to bus data", body = ErrorBody),
        (status = 404, description = "Bus not found", body = ErrorBody)
    ),
    tag = "Buses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_location(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<Bus>>, AppError> {
    let id = parse_id(&request.params.id, "Bus")?;
    let bus = BusService::update_location(&state.db, id, request.position()).await?;
    Ok(Json(ApiResponse::with_message(
        "Bus location updated successfully",
        bus,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/buses/{id}/locations",
    params(
        ("id" = String, Path, description = "Bus ID"),
        ("limit" = Option<i64>, Query, description = "Page size, 1-100 (default 10)"),
        ("offset" = Option<i64>, Query, description = "Items to skip"),
        ("page" = Option<i64>, Query, description = "1-indexed page; overrides offset")
    ),
    responses(
        (status = 200, description = "Location history, newest first", body = Paginated<Location>),
        (status = 403, description = "Permission 'locations.read' required", body = ErrorBody),
        (status = 404, description = "Bus not found", body = ErrorBody)
    ),
    tag = "Buses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn location_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedQuery(pagination): ValidatedQuery<PaginationParams>,
) -> Result<Json<Paginated<Location>>, AppError> {
    let id = parse_id(&id, "Bus")?;
    Ok(Json(
        BusService::location_history(&state.db, id, pagination).await?,
    ))
}
