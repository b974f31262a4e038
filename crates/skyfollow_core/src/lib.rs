pub mod config;
pub mod entities;
pub mod error;
pub mod ports;
pub mod retry;
pub mod use_cases;

#[cfg(test)]
mod testing;

pub use error::{Error, MigrationAborted};
