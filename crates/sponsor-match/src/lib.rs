//! Sponsor to student matching: weighted rule scoring, ranked match discovery, bulk
//! orchestration, and capacity-aware allocation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
