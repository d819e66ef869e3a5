pub mod sled_target;
