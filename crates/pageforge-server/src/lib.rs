pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod routes;
pub mod store;
