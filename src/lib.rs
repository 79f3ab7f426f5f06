//! ipscope library
//!
//! Resolves a public IP address (or a given target), enriches it with
//! geolocation and ISP data, and caches results on disk. Exposed as a library
//! so the binary and integration tests share the same pipeline.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod fallback;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;
