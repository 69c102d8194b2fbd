use axum::{
    Router,
    extract::{Request, State},
    middleware::{Next, from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};

use bustrack_core::{UserRole, permissions::LOCATIONS_READ};

use crate::middleware::auth::{optional_auth, require_auth};
use crate::middleware::role::{require_admin, require_bus_access, require_permission, require_roles};
use crate::state::AppState;

use super::controller::{
    create_bus, delete_bus, get_bus, list_buses, location_history, update_bus, update_location,
};

const FLEET_MANAGERS: &[UserRole] = &[UserRole::Admin, UserRole::Operator];

pub fn init_buses_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_buses))
        .route("/{id}", get(get_bus))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let managers = Router::new()
        .route("/", post(create_bus))
        .route("/{id}", put(update_bus))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_roles(req, next, FLEET_MANAGERS)
        }))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/{id}", delete(delete_bus))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let tracking = Router::new()
        .route("/{id}/location", put(update_location))
        .route_layer(from_fn(require_bus_access))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let history = Router::new()
        .route("/{id}/locations", get(location_history))
        .route_layer(from_fn_with_state(
            state.clone(),
            |State(s): State<AppState>, req: Request, next: Next| {
                require_permission(State(s), req, next, LOCATIONS_READ)
            },
        ))
        .route_layer(from_fn_with_state(state, require_auth));

    public
        .merge(managers)
        .merge(admin)
        .merge(tracking)
        .merge(history)
}
