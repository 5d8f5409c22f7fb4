//! Store Module
//!
//! The in-process expiring key/value store backing the memory cache provider.

mod entry;
mod lru;
mod memory;
mod stats;

pub use entry::{current_timestamp_ms, StoredValue};
pub use lru::LruTracker;
pub use memory::MemoryStore;
pub use stats::CacheStats;
