pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::{Trip, TripDetails, TripStatus};
pub use router::init_trips_router;
