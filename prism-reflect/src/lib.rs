#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Per-type metadata bags
mod metadata;
pub use metadata::*;

// The registry and its dispatch paths
mod registry;
pub use registry::*;

// Free-function dispatch and argument helpers
mod dispatch;
pub use dispatch::*;
