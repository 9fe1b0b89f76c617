pub mod aggregates;
pub mod config;
pub mod email;
pub mod error;
pub mod geocoder;
pub mod guards;
pub mod hooks;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;
