#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub use prism_core::*;
pub use prism_value::*;

pub use prism_convert::*;
pub use prism_reflect::*;

/// The member crates, for paths that want to be explicit about where a
/// symbol comes from.
pub mod crates {
    pub use prism_convert as convert;
    pub use prism_core as core;
    pub use prism_reflect as reflect;
    pub use prism_value as value;
}
