use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use bustrack_core::PaginationParams;

use crate::modules::users::model::IdParams;
use crate::validator::{alphanumeric, not_blank};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Route {
    pub id: Uuid,
    #[schema(example = "R12")]
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub origin: String,
    pub destination: String,
    #[schema(value_type = Vec<Stop>)]
    pub stops: Json<Vec<Stop>>,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct StopInput {
    #[validate(required, custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(required, range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(required, range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
}

impl StopInput {
    fn to_stop(&self) -> Stop {
        Stop {
            name: self.name.as_deref().unwrap_or_default().trim().to_string(),
            lat: self.lat.unwrap_or_default(),
            lng: self.lng.unwrap_or_default(),
        }
    }
}

fn to_stops(stops: &Option<Vec<StopInput>>) -> Option<Vec<Stop>> {
    stops
        .as_ref()
        .map(|stops| stops.iter().map(StopInput::to_stop).collect())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_string())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRouteBody {
    #[validate(required, length(min = 2, max = 20), custom(function = "alphanumeric"))]
    #[schema(example = "R12")]
    pub code: Option<String>,
    #[validate(required, length(min = 2, max = 200))]
    #[schema(example = "Central Station - Airport")]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(required, length(max = 200), custom(function = "not_blank"))]
    pub origin: Option<String>,
    #[validate(required, length(max = 200), custom(function = "not_blank"))]
    pub destination: Option<String>,
    #[validate(length(min = 2, message = "must contain at least 2 stops"), nested)]
    pub stops: Option<Vec<StopInput>>,
    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,
    #[validate(range(min = 1))]
    pub estimated_duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(nested)]
    pub body: CreateRouteBody,
}

/// Normalised column values for an insert or a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub stops: Option<Vec<Stop>>,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
}

impl CreateRouteRequest {
    pub fn changes(&self) -> RouteChanges {
        let body = &self.body;
        RouteChanges {
            code: trimmed(&body.code).map(|c| c.to_uppercase()),
            name: trimmed(&body.name),
            description: trimmed(&body.description),
            origin: trimmed(&body.origin),
            destination: trimmed(&body.destination),
            stops: to_stops(&body.stops),
            distance_km: body.distance_km,
            estimated_duration_minutes: body.estimated_duration_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRouteBody {
    #[validate(length(min = 2, max = 20), custom(function = "alphanumeric"))]
    pub code: Option<String>,
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub origin: Option<String>,
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub destination: Option<String>,
    #[validate(length(min = 2, message = "must contain at least 2 stops"), nested)]
    pub stops: Option<Vec<StopInput>>,
    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,
    #[validate(range(min = 1))]
    pub estimated_duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRouteRequest {
    pub params: IdParams,
    #[validate(nested)]
    pub body: UpdateRouteBody,
}

impl UpdateRouteRequest {
    pub fn changes(&self) -> RouteChanges {
        let body = &self.body;
        RouteChanges {
            code: trimmed(&body.code).map(|c| c.to_uppercase()),
            name: trimmed(&body.name),
            description: trimmed(&body.description),
            origin: trimmed(&body.origin),
            destination: trimmed(&body.destination),
            stops: to_stops(&body.stops),
            distance_km: body.distance_km,
            estimated_duration_minutes: body.estimated_duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct RouteFilterParams {
    /// Matches code, name, origin or destination (case-insensitive)
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: serde_json::Value) -> CreateRouteRequest {
        serde_json::from_value(json!({ "body": body })).unwrap()
    }

    #[test]
    fn test_valid_route_normalised() {
        let request = create(json!({
            "code": "r12",
            "name": " Central - Airport ",
            "origin": "Central",
            "destination": "Airport",
            "stops": [
                {"name": "Central", "lat": 6.45, "lng": 3.39},
                {"name": "Airport", "lat": 6.58, "lng": 3.32}
            ]
        }));
        assert!(request.validate().is_ok());

        let changes = request.changes();
        assert_eq!(changes.code.as_deref(), Some("R12"));
        assert_eq!(changes.name.as_deref(), Some("Central - Airport"));
        assert_eq!(changes.stops.map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_single_stop_rejected() {
        let request = create(json!({
            "code": "R1",
            "name": "Loop",
            "origin": "A",
            "destination": "B",
            "stops": [{"name": "A", "lat": 1.0, "lng": 1.0}]
        }));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_code_must_be_alphanumeric() {
        let request = create(json!({
            "code": "R-12",
            "name": "Loop",
            "origin": "A",
            "destination": "B"
        }));
        let errors = request.validate().unwrap_err();
        let details = crate::validator::flatten_errors(&errors);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].path, vec!["body", "code"]);
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let errors = create(json!({})).validate().unwrap_err();
        let details = crate::validator::flatten_errors(&errors);
        let paths: Vec<_> = details.iter().map(|d| d.path.join(".")).collect();
        assert_eq!(
            paths,
            vec!["body.code", "body.destination", "body.name", "body.origin"]
        );
    }
}
