use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use bustrack_core::{AppError, ErrorCode, ErrorDetail, Paginated};

use crate::metrics::track_trip_transition;

use super::model::{NewTrip, Trip, TripChanges, TripDetails, TripFilterParams, TripStatus};

const TRIP_COLUMNS: &str = "id, trip_name, bus_id, route_id, scheduled_departure, \
     scheduled_arrival, actual_departure, actual_arrival, status, created_at, updated_at";

const TRIP_DETAILS_SELECT: &str = "SELECT t.id, t.trip_name, t.bus_id, t.route_id, \
     t.scheduled_departure, t.scheduled_arrival, t.actual_departure, t.actual_arrival, \
     t.status, t.created_at, t.updated_at, \
     b.plate_number AS bus_plate_number, b.driver_name AS bus_driver_name, \
     r.code AS route_code, r.name AS route_name, \
     r.origin AS route_origin, r.destination AS route_destination \
     FROM trips t \
     LEFT JOIN buses b ON t.bus_id = b.id \
     LEFT JOIN routes r ON t.route_id = r.id";

fn trip_not_found() -> AppError {
    AppError::with_message(ErrorCode::NotFound, "Trip not found")
}

/// Guards the stored schedule when an update supplies only one of the times.
const SCHEDULE_CONSTRAINT: &str = "trips_schedule_order";

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return AppError::with_message(ErrorCode::BadRequest, "Bus or route does not exist");
        }
        if db_err.is_check_violation() && db_err.constraint() == Some(SCHEDULE_CONSTRAINT) {
            return schedule_error();
        }
    }
    AppError::from(e)
}

fn schedule_error() -> AppError {
    AppError::validation(vec![ErrorDetail::new(
        "\"scheduled_arrival\" must be after scheduled_departure",
        vec!["body".to_string(), "scheduled_arrival".to_string()],
    )])
}

fn check_schedule(
    departure: Option<DateTime<Utc>>,
    arrival: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(departure), Some(arrival)) = (departure, arrival)
        && arrival <= departure
    {
        return Err(schedule_error());
    }
    Ok(())
}

pub struct TripService;

impl TripService {
    #[instrument(skip(db))]
    pub async fn list_trips(
        db: &PgPool,
        filters: TripFilterParams,
    ) -> Result<Paginated<TripDetails>, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut params: Vec<String> = Vec::new();

        if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(format!("%{search}%"));
            let n = params.len();
            where_clause.push_str(&format!(
                " AND (t.trip_name ILIKE ${n} OR b.plate_number ILIKE ${n} \
                 OR r.code ILIKE ${n} OR r.name ILIKE ${n})"
            ));
        }

        if let Some(raw) = filters.status.as_deref().filter(|s| !s.trim().is_empty()) {
            // An unknown status matches nothing rather than everything.
            let status = TripStatus::parse(raw).map_or_else(|| raw.trim().to_string(), |s| s.as_str().to_string());
            params.push(status);
            where_clause.push_str(&format!(" AND t.status = ${}", params.len()));
        }

        if let Some(bus_id) = filters.bus_id {
            params.push(bus_id.to_string());
            where_clause.push_str(&format!(" AND t.bus_id = ${}::uuid", params.len()));
        }

        if let Some(route_id) = filters.route_id {
            params.push(route_id.to_string());
            where_clause.push_str(&format!(" AND t.route_id = ${}::uuid", params.len()));
        }

        let count_query = format!(
            "SELECT COUNT(*) FROM trips t \
             LEFT JOIN buses b ON t.bus_id = b.id \
             LEFT JOIN routes r ON t.route_id = r.id{where_clause}"
        );
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await?;

        let data_query = format!(
            "{TRIP_DETAILS_SELECT}{where_clause} \
             ORDER BY t.scheduled_departure DESC LIMIT {limit} OFFSET {offset}"
        );
        let mut data_sql = sqlx::query_as::<_, TripDetails>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let trips = data_sql.fetch_all(db).await?;

        Ok(Paginated::new(trips, filters.pagination.meta(total)))
    }

    #[instrument(skip(db))]
    pub async fn get_trip(db: &PgPool, id: Uuid) -> Result<TripDetails, AppError> {
        sqlx::query_as::<_, TripDetails>(&format!("{TRIP_DETAILS_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(trip_not_found)
    }

    #[instrument(skip(db))]
    pub async fn create_trip(db: &PgPool, trip: NewTrip) -> Result<Trip, AppError> {
        check_schedule(Some(trip.scheduled_departure), trip.scheduled_arrival)?;

        let created = sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (trip_name, bus_id, route_id, scheduled_departure, \
                                scheduled_arrival, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(&trip.trip_name)
        .bind(trip.bus_id)
        .bind(trip.route_id)
        .bind(trip.scheduled_departure)
        .bind(trip.scheduled_arrival)
        .bind(trip.status.as_str())
        .fetch_one(db)
        .await
        .map_err(map_write_error)?;

        info!(trip.id = %created.id, bus.id = %created.bus_id, route.id = %created.route_id, "Trip created");
        Ok(created)
    }

    /// Absent fields keep their stored value. Status only moves through
    /// [`TripService::transition`].
    #[instrument(skip(db))]
    pub async fn update_trip(db: &PgPool, id: Uuid, changes: TripChanges) -> Result<Trip, AppError> {
        check_schedule(changes.scheduled_departure, changes.scheduled_arrival)?;

        let trip = sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET \
                trip_name = COALESCE($2, trip_name), \
                bus_id = COALESCE($3, bus_id), \
                route_id = COALESCE($4, route_id), \
                scheduled_departure = COALESCE($5, scheduled_departure), \
                scheduled_arrival = COALESCE($6, scheduled_arrival), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.trip_name)
        .bind(changes.bus_id)
        .bind(changes.route_id)
        .bind(changes.scheduled_departure)
        .bind(changes.scheduled_arrival)
        .fetch_optional(db)
        .await
        .map_err(map_write_error)?
        .ok_or_else(trip_not_found)?;

        info!(trip.id = %trip.id, "Trip updated");
        Ok(trip)
    }

    #[instrument(skip(db))]
    pub async fn delete_trip(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(trip_not_found());
        }

        info!(trip.id = %id, "Trip deleted");
        Ok(())
    }

    /// Moves a trip to `target` if its current state allows it. Entering
    /// `in_progress` stamps `actual_departure`; entering `completed` stamps
    /// `actual_arrival` (with `at` when given).
    ///
    /// The state check and the write are one conditional `UPDATE`, so two
    /// racing transitions cannot both succeed.
    #[instrument(skip(db))]
    pub async fn transition(
        db: &PgPool,
        id: Uuid,
        target: TripStatus,
        at: Option<DateTime<Utc>>,
    ) -> Result<Trip, AppError> {
        let sources: Vec<&str> = target.sources().iter().map(|s| s.as_str()).collect();

        let updated = sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET \
                status = $2, \
                actual_departure = CASE WHEN $2 = 'in_progress' \
                    THEN COALESCE($4, NOW()) ELSE actual_departure END, \
                actual_arrival = CASE WHEN $2 = 'completed' \
                    THEN COALESCE($4, NOW()) ELSE actual_arrival END, \
                updated_at = NOW() \
             WHERE id = $1 AND status = ANY($3) \
             RETURNING {TRIP_COLUMNS}"
        ))
        .bind(id)
        .bind(target.as_str())
        .bind(&sources)
        .bind(at)
        .fetch_optional(db)
        .await?;

        if let Some(trip) = updated {
            track_trip_transition(target.as_str());
            info!(trip.id = %id, trip.status = %target, "Trip status changed");
            return Ok(trip);
        }

        let current = sqlx::query_scalar::<_, String>("SELECT status FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(trip_not_found)?;

        warn!(trip.id = %id, from = %current, to = %target, "Rejected trip transition");
        Err(AppError::with_message(
            ErrorCode::Conflict,
            format!("Cannot change trip status from {current} to {target}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_arrival_must_follow_departure() {
        let departure = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let arrival = Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap();

        let err = check_schedule(Some(departure), Some(arrival)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(check_schedule(Some(arrival), Some(departure)).is_ok());
        assert!(check_schedule(None, Some(arrival)).is_ok());
    }

    #[derive(Debug)]
    struct ConstraintViolation {
        check: bool,
        constraint: &'static str,
    }

    impl std::fmt::Display for ConstraintViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "violates constraint \"{}\"", self.constraint)
        }
    }

    impl std::error::Error for ConstraintViolation {}

    impl sqlx::error::DatabaseError for ConstraintViolation {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.check {
                sqlx::error::ErrorKind::CheckViolation
            } else {
                sqlx::error::ErrorKind::ForeignKeyViolation
            }
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }
    }

    fn check_violation(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintViolation { check: true, constraint }))
    }

    #[test]
    fn test_partial_schedule_update_rejected_by_stored_times() {
        let err = map_write_error(check_violation(SCHEDULE_CONSTRAINT));
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details[0].path, vec!["body", "scheduled_arrival"]);
    }

    #[test]
    fn test_other_write_errors() {
        let err = map_write_error(sqlx::Error::Database(Box::new(ConstraintViolation {
            check: false,
            constraint: "trips_bus_id_fkey",
        })));
        assert_eq!(err.code, ErrorCode::BadRequest);

        let err = map_write_error(check_violation("trips_status_check"));
        assert_ne!(err.code, ErrorCode::ValidationFailed);
    }
}
