//! Middleware components for the export server

pub mod cors;
pub mod logging;
