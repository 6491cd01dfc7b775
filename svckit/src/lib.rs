//! Data-access core for the post service.
//!
//! A [`database::ConnectionManager`] owns the one session per process,
//! bootstraps the keyspace and tables on startup and hands the session to the
//! repositories in [`repository`].

pub mod config;
pub mod database;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod types;

pub use errors::DataError;
