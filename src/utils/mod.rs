//! Shared utilities.
//!
//! - [`email`]: account mail over SMTP

pub mod email;
