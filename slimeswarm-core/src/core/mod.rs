//! Data model shared by both simulation steps: configuration, agent records
//! and the error type.

pub mod agent;
pub mod config;
pub mod error;
