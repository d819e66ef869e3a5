pub mod error;
pub mod file;
pub mod kv;
pub mod memory;
