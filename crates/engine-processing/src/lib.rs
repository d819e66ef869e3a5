pub mod batch_state;
pub mod reconciler;
pub mod tracking;
pub mod transform;
