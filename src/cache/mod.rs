//! Cache module for storing lookup results to disk
//!
//! This module provides a single-file JSON store mapping a cache key (address
//! plus family) to the last lookup result and the time it was fetched. Entries
//! older than the TTL are treated as absent, and an unreadable or corrupt file
//! is treated as an empty cache rather than an error.

mod store;

pub use store::{CacheEntry, CacheError, CacheKey, DiskCache, DEFAULT_TTL_HOURS};
