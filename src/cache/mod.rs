//! Cache consistency layer: partition registry and the partitioned store
//!
//! See [`partition`] for the closed registry of cached views and the
//! mutation-topic mapping, and [`store`] for the invalidation protocol.

pub mod partition;
pub mod store;

pub use partition::{partitions_for_topic, Partition, Topic};
pub use store::{CacheKey, CacheStats, CacheStore};
