use sqlx::{PgPool, types::Json};
use tracing::{info, instrument};
use uuid::Uuid;

use bustrack_core::{AppError, ErrorCode, Paginated};

use super::model::{Route, RouteChanges, RouteFilterParams};

const ROUTE_COLUMNS: &str = "id, code, name, description, origin, destination, stops, \
     distance_km, estimated_duration_minutes, created_at, updated_at";

fn route_not_found() -> AppError {
    AppError::with_message(ErrorCode::NotFound, "Route not found")
}

fn map_code_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::with_message(ErrorCode::Conflict, "Route with this code already exists");
    }
    AppError::from(e)
}

pub struct RouteService;

impl RouteService {
    #[instrument(skip(db))]
    pub async fn list_routes(
        db: &PgPool,
        filters: RouteFilterParams,
    ) -> Result<Paginated<Route>, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut params = Vec::new();

        if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(format!("%{search}%"));
            let n = params.len();
            where_clause.push_str(&format!(
                " AND (code ILIKE ${n} OR name ILIKE ${n} OR origin ILIKE ${n} OR destination ILIKE ${n})"
            ));
        }

        let count_query = format!("SELECT COUNT(*) FROM routes{where_clause}");
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await?;

        let data_query = format!(
            "SELECT {ROUTE_COLUMNS} FROM routes{where_clause} \
             ORDER BY code ASC LIMIT {limit} OFFSET {offset}"
        );
        let mut data_sql = sqlx::query_as::<_, Route>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let routes = data_sql.fetch_all(db).await?;

        Ok(Paginated::new(routes, filters.pagination.meta(total)))
    }

    #[instrument(skip(db))]
    pub async fn get_route(db: &PgPool, id: Uuid) -> Result<Route, AppError> {
        sqlx::query_as::<_, Route>(&format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(route_not_found)
    }

    #[instrument(skip(db))]
    pub async fn create_route(db: &PgPool, changes: RouteChanges) -> Result<Route, AppError> {
        let route = sqlx::query_as::<_, Route>(&format!(
            "INSERT INTO routes (code, name, description, origin, destination, stops, \
                                 distance_km, estimated_duration_minutes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(&changes.code)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.origin)
        .bind(&changes.destination)
        .bind(Json(changes.stops.clone().unwrap_or_default()))
        .bind(changes.distance_km)
        .bind(changes.estimated_duration_minutes)
        .fetch_one(db)
        .await
        .map_err(map_code_conflict)?;

        info!(route.id = %route.id, route.code = %route.code, "Route created");
        Ok(route)
    }

    /// Absent fields keep their stored value.
    #[instrument(skip(db))]
    pub async fn update_route(
        db: &PgPool,
        id: Uuid,
        changes: RouteChanges,
    ) -> Result<Route, AppError> {
        let route = sqlx::query_as::<_, Route>(&format!(
            "UPDATE routes SET \
                code = COALESCE($2, code), \
                name = COALESCE($3, name), \
                description = COALESCE($4, description), \
                origin = COALESCE($5, origin), \
                destination = COALESCE($6, destination), \
                stops = COALESCE($7, stops), \
                distance_km = COALESCE($8, distance_km), \
                estimated_duration_minutes = COALESCE($9, estimated_duration_minutes), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ROUTE_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.code)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.origin)
        .bind(&changes.destination)
        .bind(changes.stops.clone().map(Json))
        .bind(changes.distance_km)
        .bind(changes.estimated_duration_minutes)
        .fetch_optional(db)
        .await
        .map_err(map_code_conflict)?
        .ok_or_else(route_not_found)?;

        info!(route.id = %route.id, "Route updated");
        Ok(route)
    }

    #[instrument(skip(db))]
    pub async fn delete_route(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(route_not_found());
        }

        info!(route.id = %id, "Route deleted");
        Ok(())
    }
}
