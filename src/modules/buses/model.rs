use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use bustrack_core::PaginationParams;

use crate::modules::users::model::IdParams;
use crate::validator::{not_blank, uuid_string};

pub const BUS_STATUSES: [&str; 5] = ["active", "idle", "enroute", "maintenance", "inactive"];

fn bus_status(status: &str) -> Result<(), ValidationError> {
    if BUS_STATUSES.contains(&status.trim()) {
        return Ok(());
    }
    Err(ValidationError::new("status").with_message(
        "must be one of [active, idle, enroute, maintenance, inactive]".into(),
    ))
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Bus {
    pub id: Uuid,
    #[schema(example = "KA-01-F-1234")]
    pub plate_number: String,
    pub operator_name: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub capacity: i32,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[schema(example = "active")]
    pub status: String,
    pub route_id: Option<Uuid>,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub speed_kmph: Option<f64>,
    pub heading: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Location {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmph: Option<f64>,
    pub heading: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBusBody {
    #[validate(required, length(max = 50), custom(function = "not_blank"))]
    #[serde(alias = "plateNumber")]
    #[schema(example = "KA-01-F-1234")]
    pub plate_number: Option<String>,
    #[validate(length(max = 200))]
    pub operator_name: Option<String>,
    #[validate(length(max = 100))]
    pub driver_name: Option<String>,
    #[validate(length(max = 30))]
    pub driver_phone: Option<String>,
    #[validate(required, range(min = 1))]
    #[schema(example = 52)]
    pub capacity: Option<i32>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    /// Defaults to `active`
    #[validate(custom(function = "bus_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "uuid_string"))]
    #[serde(alias = "assignedRoute")]
    pub route_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBusRequest {
    #[validate(nested)]
    pub body: CreateBusBody,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusChanges {
    pub plate_number: Option<String>,
    pub operator_name: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub capacity: Option<i32>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub status: Option<String>,
    pub route_id: Option<Uuid>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_string())
}

fn route_uuid(value: &Option<String>) -> Option<Uuid> {
    value.as_deref().and_then(|v| Uuid::parse_str(v.trim()).ok())
}

impl CreateBusRequest {
    pub fn changes(&self) -> BusChanges {
        let body = &self.body;
        BusChanges {
            plate_number: trimmed(&body.plate_number).map(|p| p.to_uppercase()),
            operator_name: trimmed(&body.operator_name),
            driver_name: trimmed(&body.driver_name),
            driver_phone: trimmed(&body.driver_phone),
            capacity: body.capacity,
            model: trimmed(&body.model),
            year: body.year,
            status: trimmed(&body.status).or_else(|| Some("active".to_string())),
            route_id: route_uuid(&body.route_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBusBody {
    #[validate(length(max = 50), custom(function = "not_blank"))]
    #[serde(alias = "plateNumber")]
    pub plate_number: Option<String>,
    #[validate(length(max = 200))]
    pub operator_name: Option<String>,
    #[validate(length(max = 100))]
    pub driver_name: Option<String>,
    #[validate(length(max = 30))]
    pub driver_phone: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub year: Option<i32>,
    #[validate(custom(function = "bus_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "uuid_string"))]
    #[serde(alias = "assignedRoute")]
    pub route_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBusRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: UpdateBusBody,
}

impl UpdateBusRequest {
    pub fn changes(&self) -> BusChanges {
        let body = &self.body;
        BusChanges {
            plate_number: trimmed(&body.plate_number).map(|p| p.to_uppercase()),
            operator_name: trimmed(&body.operator_name),
            driver_name: trimmed(&body.driver_name),
            driver_phone: trimmed(&body.driver_phone),
            capacity: body.capacity,
            model: trimmed(&body.model),
            year: body.year,
            status: trimmed(&body.status),
            route_id: route_uuid(&body.route_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationBody {
    #[validate(required, range(min = -90.0, max = 90.0))]
    #[serde(alias = "latitude")]
    #[schema(example = 6.5244)]
    pub lat: Option<f64>,
    #[validate(required, range(min = -180.0, max = 180.0))]
    #[serde(alias = "longitude")]
    #[schema(example = 3.3792)]
    pub lng: Option<f64>,
    #[validate(range(min = 0.0, max = 200.0))]
    pub speed_kmph: Option<f64>,
    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: LocationBody,
}

/// A validated position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmph: Option<f64>,
    pub heading: Option<f64>,
}

impl UpdateLocationRequest {
    pub fn position(&self) -> Position {
        Position {
            latitude: self.body.lat.unwrap_or_default(),
            longitude: self.body.lng.unwrap_or_default(),
            speed_kmph: self.body.speed_kmph,
            heading: self.body.heading,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BusFilterParams {
    /// Matches plate number, driver or operator name (case-insensitive)
    pub search: Option<String>,
    pub status: Option<String>,
    pub route_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
