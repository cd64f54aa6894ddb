pub mod config;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod model;
pub mod on_error;
pub mod providers;
pub mod report;
pub mod sql;
