pub mod config;
pub mod evolution;
pub mod report;
pub mod settings;
