pub mod batching;
pub mod shuffling;

pub use batching::Batching;
pub use shuffling::Shuffling;
