pub mod job;
pub mod processor;
pub mod validation;
