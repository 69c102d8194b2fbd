use uuid::Uuid;

use bustrack_core::{AppError, ErrorCode};

pub mod auth;
pub mod buses;
pub mod routes;
pub mod trips;
pub mod users;

pub use self::users::model::User;

/// Path ids that are not UUIDs name nothing, so they are reported as
/// `"{entity} not found"`.
pub fn parse_id(id: &str, entity: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id.trim())
        .map_err(|_| AppError::with_message(ErrorCode::NotFound, format!("{entity} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Bus").unwrap(), id);

        let err = parse_id("42", "Bus").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.error.to_string(), "Bus not found");
    }
}
