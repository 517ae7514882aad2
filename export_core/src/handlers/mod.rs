//! HTTP handlers

pub mod exports;
pub mod health;
pub mod metrics;
pub mod routes;
