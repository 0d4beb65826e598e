#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

// Trait bitset definition
mod traits;
pub use traits::*;

// `TypeDescriptor` definition
mod descriptor;
pub use descriptor::*;

// `Describe` trait and std impls
mod describe;
pub use describe::*;

// Name-keyed registry + factories
mod registry;
pub use registry::*;

// Shared error taxonomy
mod error;
pub use error::*;
