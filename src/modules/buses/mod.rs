pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use model::{Bus, Location};
pub use router::init_buses_router;
