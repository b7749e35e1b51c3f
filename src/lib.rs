//! install-scheduler core
//!
//! Engineer-to-job recommendation, conflict detection and the assignment
//! reset protocol for installation jobs.

pub mod error;
pub mod clock;
pub mod model;
pub mod traits;
pub mod settings;
pub mod distance;
pub mod provider;
pub mod haversine;
pub mod availability;
pub mod recommend;
pub mod conflicts;
pub mod assignment;
