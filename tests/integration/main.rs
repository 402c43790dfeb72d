//! Integration tests for catwalk
//!
//! These tests use wiremock to stand in for the catalog API and run the
//! complete pipeline against a SQLite file.

mod persistence_tests;
mod pipeline_tests;
