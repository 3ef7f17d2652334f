//! Services
//!
//! Business logic services for the application.

pub mod agent_run;
