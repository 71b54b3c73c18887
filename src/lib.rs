pub mod app;
pub mod config;
pub mod controller;
pub mod dom;
pub mod image_file;
pub mod prediction;

pub use app::{start_app, Args};
