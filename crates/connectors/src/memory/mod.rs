pub mod source;
pub mod target;
