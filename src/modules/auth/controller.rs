use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use bustrack_auth::TokenPair;
use bustrack_core::{ApiResponse, AppError, ErrorBody, MessageResponse};

use crate::middleware::auth::{AuthUser, BearerToken};
use crate::modules::users::model::User;
use crate::state::AppState;
use crate::validator::Validated;

use super::model::{
    AuthSession, ForgotPasswordBody, ForgotPasswordRequest, LoginBody, LoginRequest, LogoutBody,
    LogoutRequest, RefreshBody, RefreshRequest, RegisterBody, RegisterRequest, ResetPasswordBody,
    ResetPasswordRequest, VerifyEmailBody, VerifyEmailRequest,
};
use super::service::AuthService;

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<AuthSession>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Email or username already taken", body = ErrorBody),
        (status = 429, description = "Too many requests")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Validated(request): Validated<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthSession>>), AppError> {
    let session = AuthService::register(&state, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User registered successfully", session)),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<AuthSession>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 429, description = "Too many requests")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Validated(request): Validated<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, AppError> {
    let session = AuthService::login(&state, request).await?;
    Ok(Json(ApiResponse::with_message("Login successful", session)))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshBody,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = ErrorBody)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn refresh(
    State(state): State<AppState>,
    Validated(request): Validated<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let token = request.body.refresh_token.as_deref().unwrap_or_default();
    let tokens = AuthService::refresh(&state, token).await?;
    Ok(Json(ApiResponse::ok(tokens)))
}

/// Revoke the presented access token (and refresh token, if given)
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = LogoutBody,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, token, request), fields(user.id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    BearerToken(token): BearerToken,
    Validated(request): Validated<LogoutRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::logout(&state, &token, request.body.refresh_token.as_deref()).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// The signed-in user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = AuthService::profile(&state, &user.id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordBody,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorBody)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Validated(request): Validated<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::forgot_password(&state, request).await?;
    Ok(Json(MessageResponse::new(
        "If an account exists with that email, a password reset link has been sent.",
    )))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordBody,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid, expired, revoked or wrong-purpose token", body = ErrorBody)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    Validated(request): Validated<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::reset_password(&state, request).await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// Confirm an email address with a verification token
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-email",
    request_body = VerifyEmailBody,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid, expired or wrong-purpose token", body = ErrorBody)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn verify_email(
    State(state): State<AppState>,
    Validated(request): Validated<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let token = request.body.token.as_deref().unwrap_or_default();
    AuthService::verify_email(&state, token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}
