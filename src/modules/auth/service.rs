use tracing::{info, instrument, warn};
use uuid::Uuid;

use bustrack_auth::{TokenPair, TokenPurpose};
use bustrack_core::{AppError, ErrorCode, hash_password, verify_password};

use crate::metrics::{
    track_token_issued, track_user_login_failure, track_user_login_success, track_user_registered,
};
use crate::modules::users::model::{NewUser, User};
use crate::state::AppState;

use super::model::{
    AuthSession, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};

pub struct AuthService;

impl AuthService {
    fn issue_session(state: &AppState, user: User) -> Result<AuthSession, AppError> {
        let tokens = state
            .tokens
            .issue_token_pair(&user.id.to_string(), &user.username, &user.email, user.role)
            .map_err(|e| e.into_app_error())?;
        track_token_issued("access");
        track_token_issued("refresh");
        Ok(AuthSession { user, tokens })
    }

    #[instrument(skip(state, request), fields(username = %request.username()))]
    pub async fn register(state: &AppState, request: RegisterRequest) -> Result<AuthSession, AppError> {
        let email = request.email();
        let username = request.username().to_string();

        if state.users.email_or_username_taken(&email, &username).await? {
            return Err(AppError::with_message(
                ErrorCode::Conflict,
                "User with this email or username already exists",
            ));
        }

        let user = state
            .users
            .insert_user(NewUser {
                username,
                email,
                password_hash: hash_password(request.password())?,
                role: request.role(),
                email_verified: false,
            })
            .await?;

        info!(user.id = %user.id, user.role = %user.role, "User registered");
        track_user_registered(user.role.as_str());

        match state
            .tokens
            .issue_purpose_token(&user.id.to_string(), TokenPurpose::EmailVerification)
        {
            Ok(token) => {
                track_token_issued(TokenPurpose::EmailVerification.as_str());
                let mail = state.email.email_verification(&user.username, &token);
                state.email.send_detached(user.email.clone(), mail);
            }
            Err(e) => warn!(error = %e, "Could not issue email verification token"),
        }

        Self::issue_session(state, user)
    }

    #[instrument(skip(state, request))]
    pub async fn login(state: &AppState, request: LoginRequest) -> Result<AuthSession, AppError> {
        let invalid = || AppError::with_message(ErrorCode::InvalidCredentials, "Invalid email or password");

        let Some(credentials) = state.users.find_user_by_email(&request.email()).await? else {
            track_user_login_failure("unknown_email");
            return Err(invalid());
        };

        if !verify_password(request.password(), &credentials.password_hash)? {
            warn!(user.id = %credentials.user.id, "Login failed: wrong password");
            track_user_login_failure("wrong_password");
            return Err(invalid());
        }

        track_user_login_success(credentials.user.role.as_str());
        info!(user.id = %credentials.user.id, "User logged in");
        Self::issue_session(state, credentials.user)
    }

    /// Exchanges a refresh token for a new pair and revokes the old one.
    #[instrument(skip_all)]
    pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<TokenPair, AppError> {
        if state.revocations.is_revoked(refresh_token).await? {
            warn!("Revoked refresh token presented");
            return Err(AppError::with_message(
                ErrorCode::RevokedToken,
                "Token has been revoked",
            ));
        }

        let claims = state
            .tokens
            .verify_refresh_token(refresh_token)
            .map_err(|e| e.into_app_error())?;

        let Some(user) = state.users.find_user_by_id(&claims.id).await? else {
            return Err(AppError::with_message(
                ErrorCode::UserNotFound,
                "Invalid token - user not found",
            ));
        };

        let session = Self::issue_session(state, user)?;
        state.revocations.revoke(refresh_token).await?;
        Ok(session.tokens)
    }

    #[instrument(skip_all)]
    pub async fn logout(
        state: &AppState,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        state.revocations.revoke(access_token).await?;
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            state.revocations.revoke(refresh_token).await?;
        }
        Ok(())
    }

    #[instrument(skip(state))]
    pub async fn profile(state: &AppState, user_id: &str) -> Result<User, AppError> {
        state.users.find_user_by_id(user_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::UserNotFound, "Invalid token - user not found")
        })
    }

    /// Sends a reset link when the account exists. Callers answer the same
    /// way either way.
    #[instrument(skip_all)]
    pub async fn forgot_password(
        state: &AppState,
        request: ForgotPasswordRequest,
    ) -> Result<(), AppError> {
        let email = request
            .body
            .email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let Some(credentials) = state.users.find_user_by_email(&email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let user = credentials.user;
        let token = state
            .tokens
            .issue_purpose_token(&user.id.to_string(), TokenPurpose::PasswordReset)
            .map_err(|e| e.into_app_error())?;
        track_token_issued(TokenPurpose::PasswordReset.as_str());

        let mail = state.email.password_reset(&user.username, &token);
        state.email.send_detached(user.email, mail);
        info!(user.id = %user.id, "Password reset link issued");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn reset_password(
        state: &AppState,
        request: ResetPasswordRequest,
    ) -> Result<(), AppError> {
        let token = request.body.token.as_deref().unwrap_or_default();
        let new_password = request.body.new_password.as_deref().unwrap_or_default();

        if state.revocations.is_revoked(token).await? {
            return Err(AppError::with_message(
                ErrorCode::RevokedToken,
                "Token has been revoked",
            ));
        }

        let claims = state
            .tokens
            .verify_purpose_token(token, TokenPurpose::PasswordReset)
            .map_err(|e| e.into_app_error())?;
        let user_id = parse_subject(&claims.id)?;

        let Some(credentials) = state.users.find_credentials_by_id(user_id).await? else {
            return Err(AppError::with_message(ErrorCode::NotFound, "User not found"));
        };

        state
            .users
            .update_password(user_id, &hash_password(new_password)?)
            .await?;
        state.revocations.revoke(token).await?;

        let user = credentials.user;
        let mail = state.email.password_reset_confirmation(&user.username);
        state.email.send_detached(user.email, mail);
        info!(user.id = %user_id, "Password reset");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn verify_email(state: &AppState, token: &str) -> Result<(), AppError> {
        let claims = state
            .tokens
            .verify_purpose_token(token, TokenPurpose::EmailVerification)
            .map_err(|e| e.into_app_error())?;
        let user_id = parse_subject(&claims.id)?;

        if !state.users.mark_email_verified(user_id).await? {
            return Err(AppError::with_message(ErrorCode::NotFound, "User not found"));
        }
        info!(user.id = %user_id, "Email verified");
        Ok(())
    }
}

fn parse_subject(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::with_message(ErrorCode::InvalidToken, "Invalid token"))
}
