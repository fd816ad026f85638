//! Shared configuration, errors, database helpers and domain types for HRDesk.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
