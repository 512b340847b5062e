//! Command handlers for the kood CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod init;
mod stats;

use crate::render::{Format, Render};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, error, info};

pub use auth::{login, logout, status, Status};
pub use init::init;
pub use stats::{audits, dashboard, grades, profile, skills, xp};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data that a front end can draw.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug + Render,
{
    /// Logs the message with `info!` and writes the structured data, if any, to stdout in `format`.
    pub fn print(&self, format: Format) {
        info!("{}", self.message);
        let Some(structure) = self.structure() else {
            return;
        };
        match format {
            Format::Json => match serde_json::to_string_pretty(structure) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Unable to serialize JSON output: {e}"),
            },
            Format::Text => {
                debug!("Rendering {} output as text", std::any::type_name::<T>());
                match structure.to_text() {
                    Ok(text) => print!("{text}"),
                    Err(e) => error!("Unable to render text output: {e}"),
                }
            }
        }
    }
}
