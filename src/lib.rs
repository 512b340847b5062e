pub mod api;
pub mod args;
pub mod charts;
pub mod commands;
mod config;
mod error;
pub mod metrics;
pub mod model;
pub mod render;
pub mod session;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use config::{Config, DEFAULT_API_URL};
pub use error::{Error, ErrorType, Result};
