//! # Bustrack API
//!
//! Backend for a real-time bus tracking service: routes and their stops,
//! the bus fleet with live positions, and scheduled trips. Built with Axum
//! and PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Admin CLI commands (create-admin)
//! ├── middleware/       # Authentication and authorization layers
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Register, login, token refresh/logout, password reset
//! │   ├── users/       # User accounts
//! │   ├── routes/      # Bus routes
//! │   ├── buses/       # Fleet and location updates
//! │   └── trips/       # Trips and their lifecycle
//! ├── store/            # User and revoked-token persistence
//! └── utils/            # Outgoing email
//! ```
//!
//! Each feature module follows the same layout:
//!
//! - `controller.rs`: HTTP handlers
//! - `service.rs`: Business logic and queries
//! - `model.rs`: Entities and validated request documents
//! - `router.rs`: Routes and their middleware stacks
//!
//! ## Request pipeline
//!
//! For a protected route the layers run in this order:
//!
//! 1. [`middleware::auth::require_auth`]: bearer token, revocation, signature
//!    and expiry, user lookup
//! 2. one authorization check from [`middleware::role`] or
//!    [`middleware::ownership`]
//! 3. [`validator::Validated`]: the whole request is validated and every
//!    violation reported at once
//! 4. the handler
//!
//! ## Roles
//!
//! | Role | Can |
//! |------|-----|
//! | admin | everything; created with `bustrack-cli create-admin` only |
//! | operator | manage routes, buses and trips |
//! | driver | report bus positions, start and complete trips |
//! | commuter | read routes, buses, trips and positions |
//!
//! ## API Documentation
//!
//! - Swagger UI: `/swagger-ui`
//! - Scalar: `/scalar`

pub mod cli;
pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod revocation;
pub mod router;
pub mod state;
pub mod store;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use bustrack_auth;
pub use bustrack_config;
pub use bustrack_core;
pub use bustrack_db;
