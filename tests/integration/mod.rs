//! Integration tests for tickit-report.

pub mod batch_test;
pub mod common;
pub mod export_test;
pub mod postgres_test;
