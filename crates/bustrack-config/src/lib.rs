//! # Bustrack Config
//!
//! Configuration types for the Bustrack API, loaded once from environment
//! variables at startup and handed to the components that need them.
//!
//! - [`jwt`]: Token secrets, lifetimes, issuer and audience
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`email`]: Email/SMTP configuration
//! - [`rate_limit`]: API rate limiting configuration
//!
//! # Example
//!
//! ```ignore
//! use bustrack_config::{JwtConfig, CorsConfig, EmailConfig, RateLimitConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let email_config = EmailConfig::from_env();
//! let rate_limit_config = RateLimitConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod rate_limit;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::{JwtConfig, parse_duration_secs};
pub use rate_limit::RateLimitConfig;
