#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Payload storage forms
mod payload;

// `BoxedValue` and construction helpers
mod value;
pub use value::*;

// Scalar visitor
mod visit;
pub use visit::*;

// Capability probe, vtable and skill dispatch
pub mod facade;
pub use facade::{
    DynCall, FacadeBuilder, FacadeVTable, ProxyFn, Skill, TextSerial, facade_for, register_facade,
};
