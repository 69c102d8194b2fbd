use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};

use bustrack_core::UserRole;

use crate::middleware::auth::{optional_auth, require_auth};
use crate::middleware::role::{require_admin, require_roles, require_trip_access};
use crate::state::AppState;

use super::controller::{
    cancel_trip, complete_trip, create_trip, delete_trip, get_trip, list_trips, start_trip,
    update_trip, update_trip_status,
};

const DISPATCHERS: &[UserRole] = &[UserRole::Admin, UserRole::Operator];
const CREW: &[UserRole] = &[UserRole::Admin, UserRole::Operator, UserRole::Driver];

pub fn init_trips_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_trips))
        .route("/{id}", get(get_trip))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let dispatchers = Router::new()
        .route("/", post(create_trip))
        .route("/{id}", put(update_trip))
        .route("/{id}/cancel", post(cancel_trip))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_roles(req, next, DISPATCHERS)
        }))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let crew = Router::new()
        .route("/{id}/start", post(start_trip))
        .route("/{id}/complete", post(complete_trip))
        .route_layer(from_fn(|req: Request, next: Next| require_roles(req, next, CREW)))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/{id}", delete(delete_trip))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let status = Router::new()
        .route("/{id}/status", patch(update_trip_status))
        .route_layer(from_fn(require_trip_access))
        .route_layer(from_fn_with_state(state, require_auth));

    public
        .merge(dispatchers)
        .merge(crew)
        .merge(admin)
        .merge(status)
}
