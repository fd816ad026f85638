//! HTTP surface for the HRDesk notification dispatcher.

pub mod middleware;
pub mod routes;
pub mod state;
