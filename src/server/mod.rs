//! Server module for Motorpool
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Startup configuration checks
//! - `init`: Server initialization and run loop

pub mod config;
mod init;
mod loader;
mod validation;

pub use init::run;
pub use loader::load_config;
pub use validation::validate_config;
