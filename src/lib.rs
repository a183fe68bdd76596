//! edld - External Dynamic List management daemon.
//!
//! Manages named blocklists of indicators of compromise (IPs, CIDR ranges,
//! domains, wildcard domains, and file hashes) that firewalls periodically
//! fetch as plaintext over HTTP. Every entry point (REST API, MCP tool call)
//! funnels through one validation/exclusion/mutation pipeline:
//!
//! 1. [`classify`] - classify a raw string into an IOC type
//! 2. [`exclusion`] - test the value against built-in and custom exclusion rules
//! 3. [`service`] - dedup against existing records, check list compatibility,
//!    commit the mutation, and append an audit entry
//!
//! The [`http`] and [`mcp`] modules are thin adapters over [`service`]; no
//! caller bypasses validation.

pub mod classify;
pub mod config;
pub mod exclusion;
pub mod http;
pub mod mcp;
pub mod model;
pub mod service;
pub mod store;
