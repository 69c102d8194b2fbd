//! Permission strings and the static role → permission matrix.
//!
//! Permissions are dot-scoped capability identifiers (`<resource>.<action>`).
//! The matrix is built once at startup and shared read-only; it is never
//! mutated at runtime.
//!
//! # Example
//!
//! ```ignore
//! use bustrack_core::permissions::{self, PermissionMatrix};
//! use bustrack_core::roles::UserRole;
//!
//! let matrix = PermissionMatrix::new();
//! assert!(matrix.role_has(UserRole::Operator, permissions::ROUTES_WRITE));
//! assert!(!matrix.role_has(UserRole::Commuter, permissions::ROUTES_WRITE));
//! ```

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::roles::UserRole;

// =============================================================================
// Users
// =============================================================================

pub const USERS_READ: &str = "users.read";
pub const USERS_WRITE: &str = "users.write";
pub const USERS_DELETE: &str = "users.delete";

// =============================================================================
// Routes
// =============================================================================

pub const ROUTES_READ: &str = "routes.read";
pub const ROUTES_WRITE: &str = "routes.write";
pub const ROUTES_DELETE: &str = "routes.delete";

// =============================================================================
// Buses
// =============================================================================

pub const BUSES_READ: &str = "buses.read";
pub const BUSES_WRITE: &str = "buses.write";
pub const BUSES_DELETE: &str = "buses.delete";

// =============================================================================
// Trips
// =============================================================================

pub const TRIPS_READ: &str = "trips.read";
pub const TRIPS_WRITE: &str = "trips.write";
pub const TRIPS_DELETE: &str = "trips.delete";

// =============================================================================
// Locations
// =============================================================================

pub const LOCATIONS_READ: &str = "locations.read";
pub const LOCATIONS_WRITE: &str = "locations.write";
pub const LOCATIONS_DELETE: &str = "locations.delete";

// =============================================================================
// Reports
// =============================================================================

pub const REPORTS_READ: &str = "reports.read";
pub const REPORTS_WRITE: &str = "reports.write";

/// Every permission string known to the system.
pub const ALL_PERMISSIONS: &[&str] = &[
    USERS_READ,
    USERS_WRITE,
    USERS_DELETE,
    ROUTES_READ,
    ROUTES_WRITE,
    ROUTES_DELETE,
    BUSES_READ,
    BUSES_WRITE,
    BUSES_DELETE,
    TRIPS_READ,
    TRIPS_WRITE,
    TRIPS_DELETE,
    LOCATIONS_READ,
    LOCATIONS_WRITE,
    LOCATIONS_DELETE,
    REPORTS_READ,
    REPORTS_WRITE,
];

fn grants_for(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Admin => ALL_PERMISSIONS,
        UserRole::Operator => &[
            USERS_READ,
            ROUTES_READ,
            ROUTES_WRITE,
            BUSES_READ,
            BUSES_WRITE,
            TRIPS_READ,
            TRIPS_WRITE,
            LOCATIONS_READ,
            LOCATIONS_WRITE,
            REPORTS_READ,
        ],
        UserRole::Commuter => &[ROUTES_READ, BUSES_READ, TRIPS_READ, LOCATIONS_READ],
        UserRole::Driver => &[
            ROUTES_READ,
            BUSES_READ,
            TRIPS_READ,
            LOCATIONS_READ,
            LOCATIONS_WRITE,
        ],
    }
}

/// Immutable mapping from role to granted permission set.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    grants: HashMap<UserRole, HashSet<&'static str>>,
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionMatrix {
    pub fn new() -> Self {
        let grants = UserRole::ALL
            .into_iter()
            .map(|role| (role, grants_for(role).iter().copied().collect()))
            .collect();
        Self { grants }
    }

    pub fn permissions_for(&self, role: UserRole) -> impl Iterator<Item = &'static str> + '_ {
        self.grants
            .get(&role)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn role_has(&self, role: UserRole, permission: &str) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|set| set.contains(permission))
    }

    /// Checks a role given in textual form. Unknown roles are denied
    /// everything and logged, so they stay distinguishable from a known
    /// role that simply lacks the permission.
    pub fn role_str_has(&self, role: &str, permission: &str) -> bool {
        match UserRole::parse(role) {
            Some(role) => self.role_has(role, permission),
            None => {
                warn!(role = %role, permission = %permission, "Unknown role in permission check");
                false
            }
        }
    }
}
