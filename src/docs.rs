use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use bustrack_auth::TokenPair;
use bustrack_core::{ErrorBody, ErrorCode, ErrorDetail, MessageResponse, PaginationMeta, UserRole};

use crate::modules::auth::model::{
    AuthSession, ForgotPasswordBody, LoginBody, LogoutBody, RefreshBody, RegisterBody,
    ResetPasswordBody, VerifyEmailBody,
};
use crate::modules::buses::model::{Bus, CreateBusBody, Location, LocationBody, UpdateBusBody};
use crate::modules::routes::model::{CreateRouteBody, Route, Stop, StopInput, UpdateRouteBody};
use crate::modules::trips::model::{
    CreateTripBody, Trip, TripDetails, UpdateStatusBody, UpdateTripBody,
};
use crate::modules::users::model::{ChangePasswordBody, UpdateUserBody, User};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::profile,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::auth::controller::verify_email,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::change_password,
        crate::modules::routes::controller::list_routes,
        crate::modules::routes::controller::get_route,
        crate::modules::routes::controller::create_route,
        crate::modules::routes::controller::update_route,
        crate::modules::routes::controller::delete_route,
        crate::modules::buses::controller::list_buses,
        crate::modules::buses::controller::get_bus,
        crate::modules::buses::controller::create_bus,
        crate::modules::buses::controller::update_bus,
        crate::modules::buses::controller::delete_bus,
        crate::modules::buses::controller::update_location,
        crate::modules::buses::controller::location_history,
        crate::modules::trips::controller::list_trips,
        crate::modules::trips::controller::get_trip,
        crate::modules::trips::controller::create_trip,
        crate::modules::trips::controller::update_trip,
        crate::modules::trips::controller::delete_trip,
        crate::modules::trips::controller::start_trip,
        crate::modules::trips::controller::complete_trip,
        crate::modules::trips::controller::cancel_trip,
        crate::modules::trips::controller::update_trip_status,
        crate::router::health,
    ),
    components(
        schemas(
            User,
            UserRole,
            AuthSession,
            TokenPair,
            RegisterBody,
            LoginBody,
            RefreshBody,
            LogoutBody,
            ForgotPasswordBody,
            ResetPasswordBody,
            VerifyEmailBody,
            UpdateUserBody,
            ChangePasswordBody,
            Route,
            Stop,
            StopInput,
            CreateRouteBody,
            UpdateRouteBody,
            Bus,
            Location,
            CreateBusBody,
            UpdateBusBody,
            LocationBody,
            Trip,
            TripDetails,
            CreateTripBody,
            UpdateTripBody,
            UpdateStatusBody,
            MessageResponse,
            ErrorBody,
            ErrorCode,
            ErrorDetail,
            PaginationMeta,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, sign-in and token lifecycle"),
        (name = "Users", description = "User accounts"),
        (name = "Routes", description = "Bus routes and their stops"),
        (name = "Buses", description = "Fleet and live positions"),
        (name = "Trips", description = "Scheduled trips and their lifecycle"),
        (name = "Health", description = "Liveness")
    ),
    info(
        title = "Bustrack API",
        version = "0.1.0",
        description = "Real-time bus tracking API built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
