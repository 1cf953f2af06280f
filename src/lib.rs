pub mod config;
pub mod driver;
pub mod error;
pub mod execution;
pub mod logging;
pub mod memory;
pub mod merge;
pub mod model;
pub mod repo;
pub mod stats;
pub mod store;
pub mod validate;
