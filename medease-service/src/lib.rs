pub mod models;
pub mod service;

pub use service::{create_app, create_app_from_env};
