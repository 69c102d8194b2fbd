use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{get, put},
};

use crate::middleware::auth::require_auth;
use crate::middleware::ownership::{require_ownership_or_admin, require_self_or_admin};
use crate::middleware::role::require_admin;
use crate::state::AppState;

use super::controller::{change_password, get_user, list_users, update_user};

pub fn init_users_router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users))
        .route_layer(from_fn(require_admin));

    let own_profile = Router::new()
        .route("/{id}", get(get_user).put(update_user))
        .route_layer(from_fn(require_self_or_admin));

    let own_password = Router::new()
        .route("/{id}/password", put(change_password))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_ownership_or_admin(req, next, "id")
        }));

    admin
        .merge(own_profile)
        .merge(own_password)
        .route_layer(from_fn_with_state(state, require_auth))
}
