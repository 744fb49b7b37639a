mod render;
mod routes;
mod server;
mod upload;

pub mod app;
pub mod config;
pub mod telemetry;

pub use app::{start_dashboard, start_web_form};
