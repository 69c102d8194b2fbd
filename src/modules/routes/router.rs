use axum::{
    Router,
    extract::{Request, State},
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};

use bustrack_core::permissions::ROUTES_WRITE;

use crate::middleware::auth::{optional_auth, require_auth};
use crate::middleware::role::{require_admin, require_permission};
use crate::state::AppState;

use super::controller::{create_route, delete_route, get_route, list_routes, update_route};

pub fn init_routes_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_routes))
        .route("/{id}", get(get_route))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let writers = Router::new()
        .route("/", post(create_route))
        .route("/{id}", put(update_route))
        .route_layer(from_fn_with_state(
            state.clone(),
            |State(s): State<AppState>, req: Request, next: Next| {
                require_permission(State(s), req, next, ROUTES_WRITE)
            },
        ))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/{id}", delete(delete_route))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, require_auth));

    public.merge(writers).merge(admin)
}
