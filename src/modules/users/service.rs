use tracing::{info, instrument, warn};

use bustrack_core::{
    AppError, ErrorCode, ErrorDetail, Paginated, PaginationParams, UserRole, hash_password,
    verify_password,
};

use crate::middleware::auth::AuthUser;
use crate::modules::parse_id;
use crate::state::AppState;

use super::model::{ChangePasswordRequest, UpdateUserRequest, User};

pub struct UserService;

impl UserService {
    #[instrument(skip(state))]
    pub async fn list_users(
        state: &AppState,
        pagination: PaginationParams,
    ) -> Result<Paginated<User>, AppError> {
        let (users, total) = state
            .users
            .list_users(pagination.limit(), pagination.offset())
            .await?;
        Ok(Paginated::new(users, pagination.meta(total)))
    }

    #[instrument(skip(state))]
    pub async fn get_user(state: &AppState, id: &str) -> Result<User, AppError> {
        state
            .users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::NotFound, "User not found"))
    }

    #[instrument(skip(state, request))]
    pub async fn update_user(state: &AppState, request: UpdateUserRequest) -> Result<User, AppError> {
        let id = parse_id(&request.params.id, "User")?;
        let update = request.profile_update();

        if update.is_empty() {
            return Self::get_user(state, &request.params.id).await;
        }

        let user = state
            .users
            .update_profile(id, update)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::NotFound, "User not found"))?;
        info!(user.id = %user.id, "User profile updated");
        Ok(user)
    }

    /// Non-admins must confirm their current password.
    #[instrument(skip(state, request), fields(caller.id = %caller.id))]
    pub async fn change_password(
        state: &AppState,
        caller: &AuthUser,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let id = parse_id(&request.params.id, "User")?;
        let Some(credentials) = state.users.find_credentials_by_id(id).await? else {
            return Err(AppError::with_message(ErrorCode::NotFound, "User not found"));
        };

        if caller.role != UserRole::Admin {
            let current = request.body.current_password.as_deref().unwrap_or_default();
            if current.is_empty() {
                return Err(AppError::validation(vec![ErrorDetail::new(
                    "\"current_password\" is required",
                    vec!["body".to_string(), "current_password".to_string()],
                )]));
            }
            if !verify_password(current, &credentials.password_hash)? {
                warn!(user.id = %id, "Password change rejected: wrong current password");
                return Err(AppError::with_message(
                    ErrorCode::InvalidCredentials,
                    "Current password is incorrect",
                ));
            }
        }

        let new_password = request.body.new_password.as_deref().unwrap_or_default();
        state
            .users
            .update_password(id, &hash_password(new_password)?)
            .await?;
        info!(user.id = %id, "Password changed");
        Ok(())
    }
}
