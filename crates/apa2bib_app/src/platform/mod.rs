mod app;
pub mod cli;
mod effects;
mod logging;
mod render;
mod settings;

pub use app::run_app;
