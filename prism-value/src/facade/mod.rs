//! The capability façade: probe concrete-type capabilities once at
//! registration time, store them in a per-type vtable, dispatch skill
//! invocations against any value of the type in O(1).

// Opt-in hook traits
mod hooks;
pub use hooks::*;

// `FacadeVTable` definition and trait-gated builder
mod vtable;
pub use vtable::*;

// Autoref-specialization probe (used by `probe_facade!`)
pub mod probe;

// TypeId → vtable registry and the builtin scalar tables
mod registry;
pub use registry::*;

// `Skill` and value-level dispatch
mod skill;
pub use skill::*;

// Named function proxies
mod proxy;
pub use proxy::*;
