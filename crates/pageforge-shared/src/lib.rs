pub mod api;
pub mod patch;

mod models;

pub use models::*;
