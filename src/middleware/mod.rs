//! Request authentication and authorization.
//!
//! - [`auth`]: bearer-token authentication (`require_auth`, `optional_auth`)
//!   and the `AuthUser` / `MaybeAuthUser` extractors
//! - [`role`]: role, permission, bus and trip access layers
//! - [`ownership`]: ownership-or-admin and self-or-admin layers
//!
//! Per request: authentication, then authorization, then validation (the
//! `Validated` extractor), then the handler.

pub mod auth;
pub mod ownership;
pub mod role;
