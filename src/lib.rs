//! Facility occupancy scheduler: recurring and whole-field bookings over a
//! commune → field → unit hierarchy, rendered as a half-hour slot grid.

pub mod config;
pub mod hierarchy;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod repository;
pub mod scheduler;
