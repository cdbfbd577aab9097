pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod github;
pub mod logging;

#[cfg(test)]
mod testing;

pub use error::Error;
