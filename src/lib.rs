pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod scheduler;
pub mod services;
pub mod storage;
pub mod telegram;
pub mod validation;
pub mod web;

pub use error::{Error, Result};

// Declare tests module only when testing
#[cfg(test)]
pub mod tests;
