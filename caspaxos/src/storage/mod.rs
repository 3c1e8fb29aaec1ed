//! Storage of entries and promises.
//!
//! The engine only depends on the [`Storage`] trait. [`MemoryStorage`] keeps
//! everything in memory and is meant for tests and embedded clusters.

pub mod memory;
pub mod traits;

pub use memory::MemoryStorage;
pub use traits::{KeyLock, Storage};
