//! # Bustrack Auth
//!
//! The token service for the Bustrack API.
//!
//! - [`claims`]: Claim structures for access, refresh and purpose-scoped tokens
//! - [`jwt`]: [`TokenService`] for signing, verifying and inspecting tokens
//!
//! ```ignore
//! use bustrack_auth::{TokenService, extract_bearer};
//! use bustrack_config::JwtConfig;
//!
//! let tokens = TokenService::new(JwtConfig::from_env());
//! let token = extract_bearer(header_value).ok_or(...)?;
//! let claims = tokens.verify_access_token(token)?;
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{AccessClaims, PurposeClaims, RefreshClaims, TokenPurpose};
pub use jwt::{TokenError, TokenInfo, TokenKind, TokenPair, TokenService, extract_bearer};
