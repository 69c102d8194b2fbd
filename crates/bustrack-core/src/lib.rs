//! # Bustrack Core
//!
//! Core types, errors, and utilities for the Bustrack API.
//!
//! - [`errors`]: Application error type, error-kind taxonomy and HTTP response conversion
//! - [`pagination`]: Pagination utilities for list responses
//! - [`password`]: Password hashing and verification
//! - [`response`]: Success envelopes for single entities and acknowledgements
//! - [`roles`]: The closed set of user roles
//! - [`permissions`]: Permission strings and the static role → permission matrix
//!
//! # Example
//!
//! ```ignore
//! use bustrack_core::errors::{AppError, ErrorCode};
//! use bustrack_core::permissions::{PermissionMatrix, ROUTES_WRITE};
//! use bustrack_core::roles::UserRole;
//!
//! let matrix = PermissionMatrix::new();
//! if !matrix.role_has(UserRole::Commuter, ROUTES_WRITE) {
//!     return Err(AppError::with_message(ErrorCode::MissingPermission, "Permission 'routes.write' required"));
//! }
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod response;
pub mod roles;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorBody, ErrorCode, ErrorDetail};
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use permissions::PermissionMatrix;
pub use response::{ApiResponse, MessageResponse};
pub use roles::UserRole;
