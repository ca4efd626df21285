//! `jojo-core` -- turns a directory of annotated scripts into a queryable,
//! invocable registry.
//!
//! No HTTP or process-wide state lives here; the API crate owns the
//! [`scripting::RegistryHandle`] and [`scripting::ExecutionEngine`] and
//! calls into them per request.

pub mod error;
pub mod scripting;
