pub mod batch;
pub mod entity;
