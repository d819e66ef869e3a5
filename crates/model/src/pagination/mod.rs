pub mod cursor;
pub mod state;
