pub mod pagination;
pub mod policy;
pub mod records;
pub mod statistics;
pub mod tracking;
