//! Generic in-memory query cache.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Keeps one entry per key with an `updated_at` timestamp
//! - Serves fresh entries and fetches stale or missing ones
//! - Shares a single in-flight fetch among concurrent callers of a key
//! - Supports targeted patches, invalidation and cancellation by key predicate

mod key;
mod store;

pub use key::CacheKey;
pub use store::CacheStore;
