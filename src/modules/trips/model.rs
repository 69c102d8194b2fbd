use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use bustrack_core::PaginationParams;

use crate::modules::users::model::IdParams;
use crate::validator::{iso8601, parse_iso8601, uuid_string};

/// Trip lifecycle.
///
/// ```text
/// scheduled ──start──▶ in_progress ──complete──▶ completed
///     │                     │
///     └──────cancel─────────┴──────▶ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Accepts `ongoing` as an alias of `in_progress`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" | "ongoing" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// States from which `self` can be reached.
    pub fn sources(self) -> &'static [TripStatus] {
        match self {
            Self::Scheduled => &[],
            Self::InProgress => &[Self::Scheduled],
            Self::Completed => &[Self::InProgress],
            Self::Cancelled => &[Self::Scheduled, Self::InProgress],
        }
    }

    pub fn can_transition_to(self, target: TripStatus) -> bool {
        target.sources().contains(&self)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn trip_status(value: &str) -> Result<(), ValidationError> {
    TripStatus::parse(value).map(|_| ()).ok_or_else(|| {
        ValidationError::new("status").with_message(
            "must be one of [scheduled, ongoing, in_progress, completed, cancelled]".into(),
        )
    })
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Trip {
    pub id: Uuid,
    pub trip_name: Option<String>,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    #[schema(example = "scheduled")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A trip joined with a summary of its bus and route.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TripDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trip: Trip,
    pub bus_plate_number: Option<String>,
    pub bus_driver_name: Option<String>,
    pub route_code: Option<String>,
    pub route_name: Option<String>,
    pub route_origin: Option<String>,
    pub route_destination: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTripBody {
    #[validate(length(max = 200))]
    pub trip_name: Option<String>,
    #[validate(required, custom(function = "uuid_string"))]
    #[serde(alias = "bus")]
    pub bus_id: Option<String>,
    #[validate(required, custom(function = "uuid_string"))]
    #[serde(alias = "route")]
    pub route_id: Option<String>,
    #[validate(required, custom(function = "iso8601"))]
    #[serde(alias = "departureTime")]
    #[schema(example = "2025-03-01T08:30:00Z")]
    pub scheduled_departure: Option<String>,
    #[validate(custom(function = "iso8601"))]
    #[serde(alias = "arrivalTime")]
    pub scheduled_arrival: Option<String>,
    /// Defaults to `scheduled`
    #[validate(custom(function = "trip_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    #[validate(nested)]
    pub body: CreateTripBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub trip_name: Option<String>,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub scheduled_departure: DateTime<Utc>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub status: TripStatus,
}

fn uuid_of(value: &Option<String>) -> Option<Uuid> {
    value.as_deref().and_then(|v| Uuid::parse_str(v.trim()).ok())
}

fn time_of(value: &Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(parse_iso8601)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_string())
}

impl CreateTripRequest {
    /// `None` only if called on an unvalidated request.
    pub fn new_trip(&self) -> Option<NewTrip> {
        let body = &self.body;
        Some(NewTrip {
            trip_name: trimmed(&body.trip_name),
            bus_id: uuid_of(&body.bus_id)?,
            route_id: uuid_of(&body.route_id)?,
            scheduled_departure: time_of(&body.scheduled_departure)?,
            scheduled_arrival: time_of(&body.scheduled_arrival),
            status: body
                .status
                .as_deref()
                .and_then(TripStatus::parse)
                .unwrap_or(TripStatus::Scheduled),
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTripBody {
    #[validate(length(max = 200))]
    pub trip_name: Option<String>,
    #[validate(custom(function = "uuid_string"))]
    #[serde(alias = "bus")]
    pub bus_id: Option<String>,
    #[validate(custom(function = "uuid_string"))]
    #[serde(alias = "route")]
    pub route_id: Option<String>,
    #[validate(custom(function = "iso8601"))]
    #[serde(alias = "departureTime")]
    pub scheduled_departure: Option<String>,
    #[validate(custom(function = "iso8601"))]
    #[serde(alias = "arrivalTime")]
    pub scheduled_arrival: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTripRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: UpdateTripBody,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripChanges {
    pub trip_name: Option<String>,
    pub bus_id: Option<Uuid>,
    pub route_id: Option<Uuid>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
}

impl UpdateTripRequest {
    pub fn changes(&self) -> TripChanges {
        let body = &self.body;
        TripChanges {
            trip_name: trimmed(&body.trip_name),
            bus_id: uuid_of(&body.bus_id),
            route_id: uuid_of(&body.route_id),
            scheduled_departure: time_of(&body.scheduled_departure),
            scheduled_arrival: time_of(&body.scheduled_arrival),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusBody {
    #[validate(required, custom(function = "trip_status"))]
    #[schema(example = "ongoing")]
    pub status: Option<String>,
    /// Stamped as `actual_arrival` when completing; defaults to now
    #[validate(custom(function = "iso8601"))]
    #[serde(alias = "arrivalTime")]
    pub arrival_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: UpdateStatusBody,
}

impl UpdateStatusRequest {
    pub fn target(&self) -> Option<TripStatus> {
        self.body.status.as_deref().and_then(TripStatus::parse)
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        time_of(&self.body.arrival_time)
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct TripFilterParams {
    /// Matches trip name, bus plate number, route code or route name
    pub search: Option<String>,
    /// `ongoing` is accepted for `in_progress`
    pub status: Option<String>,
    pub bus_id: Option<Uuid>,
    pub route_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_aliases() {
        assert_eq!(TripStatus::parse("ongoing"), Some(TripStatus::InProgress));
        assert_eq!(TripStatus::parse("IN_PROGRESS"), Some(TripStatus::InProgress));
        assert_eq!(TripStatus::parse("delayed"), None);
        assert_eq!(TripStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_transition_table() {
        use TripStatus::*;

        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Scheduled));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn test_create_accepts_legacy_names() {
        let request: CreateTripRequest = serde_json::from_value(json!({
            "body": {
                "bus": "6f1c1b9e-2f5a-4a8e-9a55-0f1d6b1b2c3d",
                "route": "0b7e3c52-8d4f-4c39-a1d2-3e4f5a6b7c8d",
                "departureTime": "2025-03-01T08:30:00Z",
                "status": "ongoing"
            }
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let trip = request.new_trip().unwrap();
        assert_eq!(trip.status, TripStatus::InProgress);
        assert_eq!(trip.scheduled_arrival, None);
    }

    #[test]
    fn test_create_reports_every_violation() {
        let request: CreateTripRequest = serde_json::from_value(json!({
            "body": {"bus_id": "bus-1", "scheduled_departure": "tomorrow"}
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let details = crate::validator::flatten_errors(&errors);
        let paths: Vec<_> = details.iter().map(|d| d.path.join(".")).collect();
        assert_eq!(
            paths,
            vec!["body.bus_id", "body.route_id", "body.scheduled_departure"]
        );
    }

    #[test]
    fn test_status_body_requires_known_status() {
        let request: UpdateStatusRequest = serde_json::from_value(json!({
            "params": {"id": "t1"},
            "body": {"status": "delayed"}
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
