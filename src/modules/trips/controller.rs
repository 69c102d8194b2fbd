use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use bustrack_core::{ApiResponse, AppError, ErrorBody, ErrorCode, MessageResponse, Paginated};

use crate::middleware::auth::AuthUser;
use crate::modules::parse_id;
use crate::state::AppState;
use crate::validator::{Validated, ValidatedQuery};

use super::model::{
    CreateTripBody, CreateTripRequest, Trip, TripDetails, TripFilterParams, TripStatus,
    UpdateStatusBody, UpdateStatusRequest, UpdateTripBody, UpdateTripRequest,
};
use super::service::TripService;

#[utoipa::path(
    get,
    path = "/api/v1/trips",
    params(TripFilterParams),
    responses(
        (status = 200, description = "Trips with bus and route summary, latest departure first", body = Paginated<TripDetails>)
    ),
    tag = "Trips"
)]
#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
    ValidatedQuery(filters): ValidatedQuery<TripFilterParams>,
) -> Result<Json<Paginated<TripDetails>>, AppError> {
    Ok(Json(TripService::list_trips(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/trips/{id}",
    params(("id" = String, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip with bus and route summary", body = ApiResponse<TripDetails>),
        (status = 404, description = "Trip not found", body = ErrorBody)
    ),
    tag = "Trips"
)]
#[instrument(skip(state))]
pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TripDetails>>, AppError> {
    let id = parse_id(&id, "Trip")?;
    Ok(Json(ApiResponse::ok(TripService::get_trip(&state.db, id).await?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trips",
    request_body = CreateTripBody,
    responses(
        (status = 201, description = "Trip created", body = ApiResponse<Trip>),
        (status = 400, description = "Validation failed or unknown bus/route", body = ErrorBody),
        (status = 403, description = "Admin or operator role required", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn create_trip(
    State(state): State<AppState>,
    Validated(request): Validated<CreateTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Trip>>), AppError> {
    let new_trip = request.new_trip().ok_or_else(|| {
        AppError::with_message(ErrorCode::BadRequest, "Invalid trip request")
    })?;
    let trip = TripService::create_trip(&state.db, new_trip).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Trip created successfully", trip)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/trips/{id}",
    params(("id" = String, Path, description = "Trip ID")),
    request_body = UpdateTripBody,
    responses(
        (status = 200, description = "Trip updated", body = ApiResponse<Trip>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Admin or operator role required", body = ErrorBody),
        (status = 404, description = "Trip not found", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_trip(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateTripRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let id = parse_id(&request.params.id, "Trip")?;
    let trip = TripService::update_trip(&state.db, id, request.changes()).await?;
    Ok(Json(ApiResponse::with_message("Trip updated successfully", trip)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/trips/{id}",
    params(("id" = String, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorBody),
        (status = 404, description = "Trip not found", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Trip")?;
    TripService::delete_trip(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Trip deleted successfully")))
}

async fn move_trip(
    state: &AppState,
    caller: &AuthUser,
    id: &str,
    target: TripStatus,
    message: &str,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let id = parse_id(id, "Trip")?;
    let trip = TripService::transition(&state.db, id, target, None).await?;
    tracing::debug!(caller.id = %caller.id, trip.id = %id, "Trip moved by caller");
    Ok(Json(ApiResponse::with_message(message, trip)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trips/{id}/start",
    params(("id" = String, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip in progress", body = ApiResponse<Trip>),
        (status = 404, description = "Trip not found", body = ErrorBody),
        (status = 409, description = "Trip is not scheduled", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, caller))]
pub async fn start_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    move_trip(&state, &caller, &id, TripStatus::InProgress, "Trip started successfully").await
}

#[utoipa::path(
    post,
    path = "/api/v1/trips/{id}/complete",
    params(("id" = String, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip completed", body = ApiResponse<Trip>),
        (status = 404, description = "Trip not found", body = ErrorBody),
        (status = 409, description = "Trip is not in progress", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, caller))]
pub async fn complete_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    move_trip(&state, &caller, &id, TripStatus::Completed, "Trip completed successfully").await
}

#[utoipa::path(
    post,
    path = "/api/v1/trips/{id}/cancel",
    params(("id" = String, Path, description = "Trip ID")),
    responses(
        (status = 200, description = "Trip cancelled", body = ApiResponse<Trip>),
        (status = 404, description = "Trip not found", body = ErrorBody),
        (status = 409, description = "Trip already finished", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, caller))]
pub async fn cancel_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    move_trip(&state, &caller, &id, TripStatus::Cancelled, "Trip cancelled successfully").await
}

#[utoipa::path(
    patch,
    path = "/api/v1/trips/{id}/status",
    params(("id" = String, Path, description = "Trip ID")),
    request_body = UpdateStatusBody,
    responses(
        (status = 200, description = "Trip status changed", body = ApiResponse<Trip>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Trip modification not allowed", body = ErrorBody),
        (status = 404, description = "Trip not found", body = ErrorBody),
        (status = 409, description = "Transition not allowed", body = ErrorBody)
    ),
    tag = "Trips",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request))]
pub async fn update_trip_status(
    State(state): State<AppState>,
    Validated(request): Validated<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let id = parse_id(&request.params.id, "Trip")?;
    let target = request
        .target()
        .ok_or_else(|| AppError::with_message(ErrorCode::BadRequest, "Unknown trip status"))?;
    let trip = TripService::transition(&state.db, id, target, request.arrival_time()).await?;
    Ok(Json(ApiResponse::with_message(
        "Trip status updated successfully",
        trip,
    )))
}
