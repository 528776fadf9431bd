//! tickit-report - Runs analytical SQL queries and exports each result to CSV.
//!
//! This library exposes the core modules for use in integration tests.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod preview;
pub mod runner;
