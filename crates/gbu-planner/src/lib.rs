//! Event risk assessments ("Gefährdungsbeurteilungen"): hazard library, criteria
//! catalog, rule-based auto-selection and on-site briefings.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
