pub mod connectors;
pub mod error;
pub mod reporter;
pub mod state;
pub mod statistics;
