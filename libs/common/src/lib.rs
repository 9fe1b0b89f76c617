//! Common library for the Devcamp API
//!
//! This crate provides the infrastructure shared by the API service: the
//! PostgreSQL connection pool and the generic JSONB document store the
//! service layer is built on.

pub mod database;
pub mod error;
pub mod store;
