//! Core data types for the trellis dependency resolver.
//!
//! This crate defines the declarative model a resolution runs against:
//! versions and version ranges, artifact identifiers, artifact graph nodes,
//! dependency path specifications, path policies, overrides, conflict
//! declarations, and resolver configuration.
//!
//! This crate is intentionally free of network I/O; the only filesystem
//! access is optional configuration loading.

/// Path name assumed when a path spec does not name its `from` side.
pub const DEFAULT_PATH: &str = "runtime";

pub mod artifact;
pub mod config;
pub mod errors;
pub mod path;
pub mod version;
