use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use bustrack_core::{AppError, ErrorCode, Paginated, PaginationParams};

use crate::metrics::track_location_update;

use super::model::{Bus, BusChanges, BusFilterParams, Location, Position};

const BUS_COLUMNS: &str = "id, plate_number, operator_name, driver_name, driver_phone, capacity, \
     model, year, status, route_id, current_latitude, current_longitude, speed_kmph, heading, \
     last_location_update, created_at, updated_at";

fn bus_not_found() -> AppError {
    AppError::with_message(ErrorCode::NotFound, "Bus not found")
}

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::with_message(
                ErrorCode::Conflict,
                "Bus with this plate number already exists",
            );
        }
        if db_err.is_foreign_key_violation() {
            return AppError::with_message(ErrorCode::BadRequest, "Route does not exist");
        }
    }
    AppError::from(e)
}

pub struct BusService;

impl BusService {
    #[instrument(skip(db))]
    pub async fn list_buses(
        db: &PgPool,
        filters: BusFilterParams,
    ) -> Result<Paginated<Bus>, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut params: Vec<String> = Vec::new();

        if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(format!("%{search}%"));
            let n = params.len();
            where_clause.push_str(&format!(
                " AND (plate_number ILIKE ${n} OR driver_name ILIKE ${n} OR operator_name ILIKE ${n})"
            ));
        }

        if let Some(status) = filters.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(status.to_lowercase());
            where_clause.push_str(&format!(" AND status = ${}", params.len()));
        }

        if let Some(route_id) = filters.route_id {
            params.push(route_id.to_string());
            where_clause.push_str(&format!(" AND route_id = ${}::uuid", params.len()));
        }

        let count_query = format!("SELECT COUNT(*) FROM buses{where_clause}");
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await?;

        let data_query = format!(
            "SELECT {BUS_COLUMNS} FROM buses{where_clause} \
             ORDER BY created_at DESC LIMIT {limit} OFFSET {offset}"
        );
        let mut data_sql = sqlx::query_as::<_, Bus>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let buses = data_sql.fetch_all(db).await?;

        Ok(Paginated::new(buses, filters.pagination.meta(total)))
    }

    #[instrument(skip(db))]
    pub async fn get_bus(db: &PgPool, id: Uuid) -> Result<Bus, AppError> {
        sqlx::query_as::<_, Bus>(&format!("SELECT {BUS_COLUMNS} FROM buses WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(bus_not_found)
    }

    #[instrument(skip(db))]
    pub async fn create_bus(db: &PgPool, changes: BusChanges) -> Result<Bus, AppError> {
        let bus = sqlx::query_as::<_, Bus>(&format!(
            "INSERT INTO buses (plate_number, operator_name, driver_name, driver_phone, capacity, \
                                model, year, status, route_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {BUS_COLUMNS}"
        ))
        .bind(&changes.plate_number)
        .bind(&changes.operator_name)
        .bind(&changes.driver_name)
        .bind(&changes.driver_phone)
        .bind(changes.capacity)
        .bind(&changes.model)
        .bind(changes.year)
        .bind(changes.status.as_deref().unwrap_or("active"))
        .bind(changes.route_id)
        .fetch_one(db)
        .await
        .map_err(map_write_error)?;

        info!(bus.id = %bus.id, bus.plate_number = %bus.plate_number, "Bus created");
        Ok(bus)
    }

    /// Absent fields keep their stored value.
    #[instrument(skip(db))]
    pub async fn update_bus(db: &PgPool, id: Uuid, changes: BusChanges) -> Result<Bus, AppError> {
        let bus = sqlx::query_as::<_, Bus>(&format!(
            "UPDATE buses SET \
                plate_number = COALESCE($2, plate_number), \
                operator_name = COALESCE($3, operator_name), \
                driver_name = COALESCE($4, driver_name), \
                driver_phone = COALESCE($5, driver_phone), \
                capacity = COALESCE($6, capacity), \
                model = COALESCE($7, model), \
                year = COALESCE($8, year), \
                status = COALESCE($9, status), \
                route_id = COALESCE($10, route_id), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BUS_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.plate_number)
        .bind(&changes.operator_name)
        .bind(&changes.driver_name)
        .bind(&changes.driver_phone)
        .bind(changes.capacity)
        .bind(&changes.model)
        .bind(changes.year)
        .bind(&changes.status)
        .bind(changes.route_id)
        .fetch_optional(db)
        .await
        .map_err(map_write_error)?
        .ok_or_else(bus_not_found)?;

        info!(bus.id = %bus.id, "Bus updated");
        Ok(bus)
    }

    #[instrument(skip(db))]
    pub async fn delete_bus(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM buses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(bus_not_found());
        }

        info!(bus.id = %id, "Bus deleted");
        Ok(())
    }

    /// Moves the bus and appends the fix to its history in one transaction.
    #[instrument(skip(db))]
    pub async fn update_location(
        db: &PgPool,
        id: Uuid,
        position: Position,
    ) -> Result<Bus, AppError> {
        let mut tx = db.begin().await?;

        let bus = sqlx::query_as::<_, Bus>(&format!(
            "UPDATE buses SET \
                current_latitude = $2, \
                current_longitude = $3, \
                speed_kmph = $4, \
                heading = $5, \
                last_location_update = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BUS_COLUMNS}"
        ))
        .bind(id)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(position.speed_kmph)
        .bind(position.heading)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(bus_not_found)?;

        sqlx::query(
            "INSERT INTO locations (bus_id, latitude, longitude, speed_kmph, heading) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(position.speed_kmph)
        .bind(position.heading)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        track_location_update();
        info!(
            bus.id = %id,
            latitude = position.latitude,
            longitude = position.longitude,
            "Bus location updated"
        );
        Ok(bus)
    }

    /// Newest first.
    #[instrument(skip(db))]
    pub async fn location_history(
        db: &PgPool,
        id: Uuid,
        pagination: PaginationParams,
    ) -> Result<Paginated<Location>, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM buses WHERE id = $1)")
            .bind(id)
            .fetch_one(db)
            .await?;
        if !exists {
            return Err(bus_not_found());
        }

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM locations WHERE bus_id = $1")
            .bind(id)
            .fetch_one(db)
            .await?;

        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, bus_id, latitude, longitude, speed_kmph, heading, recorded_at \
             FROM locations WHERE bus_id = $1 \
             ORDER BY recorded_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(Paginated::new(locations, pagination.meta(total)))
    }
}
