#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Edge definitions and constructors
mod edge;
pub use edge::*;

// Graph, pathfinding and the process-wide instance
mod graph;
pub use graph::*;
