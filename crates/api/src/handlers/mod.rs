pub mod activation;
pub mod conflicts;
pub mod queue;
pub mod sessions;
